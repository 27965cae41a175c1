mod app;
mod config;
mod dot;
mod field;
mod horizon;
mod render;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
