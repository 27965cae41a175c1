use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Drawing operations the wave engine needs from a rendering surface.
/// Coordinates are subpixels in the same space as the surface dimensions
/// handed to the field, so the engine stays independent of the host.
pub(crate) trait Surface {
    fn clear(&mut self);
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Pixel);
    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Pixel);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Subpixel canvas at 2×4 braille dots per terminal cell.
pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Pixel>,
}

impl PixelCanvas {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    fn blend_over(&mut self, x: i32, y: i32, src: Pixel) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0;

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }
}

impl Surface for PixelCanvas {
    fn clear(&mut self) {
        self.px.fill(Pixel::default());
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Pixel) {
        let rr = radius * radius;
        let x0 = (x - radius).floor() as i32;
        let x1 = (x + radius).ceil() as i32;
        let y0 = (y - radius).floor() as i32;
        let y1 = (y + radius).ceil() as i32;
        let mut lit = false;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - x;
                let dy = py as f32 + 0.5 - y;
                if dx * dx + dy * dy <= rr {
                    self.blend_over(px, py, color);
                    lit = true;
                }
            }
        }
        // Even the farthest dots should light at least one subpixel.
        if !lit {
            self.blend_over(x.floor() as i32, y.floor() as i32, color);
        }
    }

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Pixel) {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let len = (dx * dx + dy * dy).sqrt();
        if len < f32::EPSILON {
            self.fill_circle(x0, y0, width * 0.5, color);
            return;
        }
        let steps = len.ceil() as u32;
        let half = (width * 0.5).max(0.5);
        let mut last = (i32::MIN, i32::MIN);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let cx = x0 + dx * t;
            let cy = y0 + dy * t;
            let stamp = (cx.round() as i32, cy.round() as i32);
            if stamp == last {
                continue;
            }
            last = stamp;
            // Square stamp, thickness from the configured width.
            let sx0 = (cx - half).floor() as i32;
            let sx1 = (cx + half).ceil() as i32 - 1;
            let sy0 = (cy - half).floor() as i32;
            let sy1 = (cy + half).ceil() as i32 - 1;
            for py in sy0..=sy1 {
                for px in sx0..=sx1 {
                    self.blend_over(px, py, color);
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
}

pub(crate) fn put_text(buf: &mut CellBuffer, x: u16, y: u16, text: &str, fg: Color, bg: Color) {
    let mut cx = x;
    for ch in text.chars() {
        if cx >= buf.w {
            break;
        }
        buf.set(cx, y, Cell { ch, fg, bg });
        cx += 1;
    }
}

/* -----------------------------
   Braille encoding: 2×4 subpixels -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    // Dot mapping:
    // (0,0)=1 (0,1)=2 (0,2)=4 (0,3)=64
    // (1,0)=8 (1,1)=16 (1,2)=32 (1,3)=128
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

fn braille_char(mask: u8) -> char {
    char::from_u32(0x2800 + mask as u32).unwrap_or(' ')
}

/// Downsamples the subpixel canvas into braille cells. Foreground color
/// per cell comes from its brightest lit subpixel.
pub(crate) fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer, bg: Color) {
    let cols = out.w as u32;
    let rows = out.h as u32;
    for cy in 0..rows {
        for cx in 0..cols {
            let mut mask: u8 = 0;
            let mut best_lum: u32 = 0;
            let mut best = (255u8, 255u8, 255u8);

            for dy in 0..4 {
                for dx in 0..2 {
                    let px = cx * 2 + dx;
                    let py = cy * 4 + dy;
                    if px >= canvas.w || py >= canvas.h {
                        continue;
                    }
                    let p = canvas.px[canvas.idx(px, py)];
                    if p.a <= 16 {
                        continue;
                    }
                    mask |= braille_bit(dx, dy);
                    let lum =
                        2126 * p.r as u32 + 7152 * p.g as u32 + 722 * p.b as u32;
                    if lum > best_lum {
                        best_lum = lum;
                        best = (p.r, p.g, p.b);
                    }
                }
            }

            let cell = if mask == 0 {
                Cell {
                    ch: ' ',
                    fg: Color::White,
                    bg,
                }
            } else {
                Cell {
                    ch: braille_char(mask),
                    fg: Color::Rgb {
                        r: best.0,
                        g: best.1,
                        b: best.2,
                    },
                    bg,
                }
            };
            out.set(cx as u16, cy as u16, cell);
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    pub(crate) canvas: PixelCanvas,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        let prev = CellBuffer::new(cols, rows);
        let cur = CellBuffer::new(cols, rows);
        let canvas = PixelCanvas::new(cols as u32 * 2, rows as u32 * 4);

        Ok(Self {
            out,
            cols,
            rows,
            prev,
            cur,
            canvas,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        self.canvas = PixelCanvas::new(c as u32 * 2, r as u32 * 4);
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Pixel = Pixel {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    #[test]
    fn braille_bits_cover_all_eight_dots() {
        let mut mask = 0u8;
        for dy in 0..4 {
            for dx in 0..2 {
                mask |= braille_bit(dx, dy);
            }
        }
        assert_eq!(mask, 0xFF);
        assert_eq!(braille_char(0xFF), '\u{28FF}');
    }

    #[test]
    fn tiny_circles_still_light_a_subpixel() {
        let mut canvas = PixelCanvas::new(8, 8);
        canvas.fill_circle(4.0, 4.0, 0.3, WHITE);
        assert!(canvas.px.iter().any(|p| p.a > 0));
    }

    #[test]
    fn clear_resets_every_subpixel() {
        let mut canvas = PixelCanvas::new(8, 8);
        canvas.fill_circle(4.0, 4.0, 3.0, WHITE);
        canvas.clear();
        assert!(canvas.px.iter().all(|p| p.a == 0));
    }

    #[test]
    fn lit_canvas_becomes_braille_cells() {
        let mut canvas = PixelCanvas::new(4, 8);
        let mut cells = CellBuffer::new(2, 2);
        canvas.fill_circle(1.0, 2.0, 1.0, WHITE);
        canvas_to_cells(&canvas, &mut cells, Color::Black);
        let lit = cells
            .cells
            .iter()
            .filter(|c| ('\u{2800}'..='\u{28FF}').contains(&c.ch))
            .count();
        assert!(lit >= 1);
        assert_eq!(cells.cells[cells.idx(1, 1)].ch, ' ');
    }

    #[test]
    fn lines_march_between_their_endpoints() {
        let mut canvas = PixelCanvas::new(16, 16);
        canvas.stroke_line(0.0, 8.0, 15.0, 8.0, 1.0, WHITE);
        for x in [0u32, 7, 15] {
            assert!(canvas.px[canvas.idx(x, 8)].a > 0, "x={x} unlit");
        }
        assert_eq!(canvas.px[canvas.idx(8, 0)].a, 0);
    }
}
