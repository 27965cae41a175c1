use crate::config::{self, WaveConfig, WavePattern};
use crate::field::WaveField;
use crate::render::{canvas_to_cells, put_text, Terminal};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::Color;
use std::time::{Duration, Instant};

const TILT_STEP: f32 = 0.05;

struct App {
    config: WaveConfig,
    loaded: WaveConfig,
    term: Terminal,
    field: WaveField,
    show_status: bool,
    should_quit: bool,
}

pub(crate) fn run() -> Result<()> {
    let paths = config::project_paths()?;

    // Pick the configuration before touching the terminal so a broken
    // settings file fails with a readable error.
    let (cols, rows) = crossterm::terminal::size()?;
    let loaded = config::load_config(&paths.config_path)
        .unwrap_or_else(|| WaveConfig::for_canvas(cols as f32 * 2.0, rows as f32 * 4.0));
    let field = WaveField::new(
        loaded.clone(),
        cols as f32 * 2.0,
        rows as f32 * 4.0,
    )?;

    let term = Terminal::begin()?;
    let mut app = App {
        config: loaded.clone(),
        loaded,
        term,
        field,
        show_status: true,
        should_quit: false,
    };
    if (app.term.cols, app.term.rows) != (cols, rows) {
        app.field
            .resize(app.term.canvas.w as f32, app.term.canvas.h as f32);
    }

    let res = app.run_loop();
    let cleanup = app.term.end();
    config::save_config_atomic(&paths.config_path, &app.config)?;
    res.and(cleanup)
}

impl App {
    fn run_loop(&mut self) -> Result<()> {
        // The loop ticks well above the configured cap; the field's own
        // frame gate decides which ticks actually draw.
        let tick = Duration::from_millis(4);

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                self.field
                    .resize(self.term.canvas.w as f32, self.term.canvas.h as f32);
            }

            self.handle_input()?;
            if self.should_quit {
                break;
            }

            let now = Instant::now();
            let step = self.field.step(&mut self.term.canvas, now);
            if step.drew {
                canvas_to_cells(&self.term.canvas, &mut self.term.cur, Color::Black);
                if self.show_status {
                    self.draw_status();
                }
                self.term.present()?;
            }
            if !step.rearm {
                // Single-pass mode: no more redraws, keep the frame on
                // screen until the user dismisses it.
                wait_for_key()?;
                break;
            }

            spin_sleep(tick, now);
        }
        Ok(())
    }

    fn handle_input(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            let ev = event::read()?;
            let key = match ev {
                Event::Key(k) if k.kind != KeyEventKind::Release => k,
                _ => continue,
            };

            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                self.should_quit = true;
                return Ok(());
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                    self.should_quit = true;
                    return Ok(());
                }
                KeyCode::Char('h') | KeyCode::Char('H') => {
                    self.show_status = !self.show_status;
                    // A freshly hidden status line should not linger
                    // until the next drawn frame.
                    canvas_to_cells(&self.term.canvas, &mut self.term.cur, Color::Black);
                    if self.show_status {
                        self.draw_status();
                    }
                    self.term.present()?;
                }
                KeyCode::Char('1') => self.retune(|c| c.wave_pattern = WavePattern::Straight)?,
                KeyCode::Char('2') => self.retune(|c| c.wave_pattern = WavePattern::OutsideIn)?,
                KeyCode::Char('3') => self.retune(|c| c.wave_pattern = WavePattern::InsideOut)?,
                KeyCode::Char('[') => self.retune(|c| c.horizon_angle -= TILT_STEP)?,
                KeyCode::Char(']') => self.retune(|c| c.horizon_angle += TILT_STEP)?,
                KeyCode::Char('b') | KeyCode::Char('B') => {
                    self.retune(|c| c.backwards = !c.backwards)?
                }
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    let loaded = self.loaded.clone();
                    self.retune(move |c| *c = loaded)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Applies a config tweak and rebuilds the field; a new dot
    /// generation replaces the old one wholesale.
    fn retune(&mut self, tweak: impl FnOnce(&mut WaveConfig)) -> Result<()> {
        tweak(&mut self.config);
        self.field = WaveField::new(
            self.config.clone(),
            self.term.canvas.w as f32,
            self.term.canvas.h as f32,
        )?;
        Ok(())
    }

    fn draw_status(&mut self) {
        let pattern = match self.config.wave_pattern {
            WavePattern::Straight => "straight",
            WavePattern::OutsideIn => "outside-in",
            WavePattern::InsideOut => "inside-out",
        };
        let line = format!(
            "dotwave  {}{}  tilt {:+.2}  {} dots",
            pattern,
            if self.config.backwards { " (reversed)" } else { "" },
            self.config.horizon_angle,
            self.field.dots().len(),
        );
        put_text(
            &mut self.term.cur,
            0,
            0,
            &line,
            Color::Rgb {
                r: 210,
                g: 210,
                b: 210,
            },
            Color::Black,
        );
        put_text(
            &mut self.term.cur,
            0,
            1,
            "1/2/3 pattern  [ ] tilt  B reverse  R reset  H hide  Q quit",
            Color::Rgb {
                r: 140,
                g: 140,
                b: 140,
            },
            Color::Black,
        );
    }
}

fn wait_for_key() -> Result<()> {
    loop {
        if let Event::Key(k) = event::read()? {
            if k.kind != KeyEventKind::Release {
                return Ok(());
            }
        }
    }
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
