use crate::config::WaveConfig;
use crate::dot::{DotParams, WaveDot};
use crate::horizon::PerspectiveCurve;
use crate::render::{Pixel, Surface};
use anyhow::Result;
use std::time::{Duration, Instant};

/// Decorative perspective grid overlay.
const GRID_COLOR: Pixel = Pixel {
    r: 110,
    g: 10,
    b: 10,
    a: 255,
};
const GRID_WIDTH: f32 = 2.0;

/// Vertical share of the surface the grid occupies; the rest splits into
/// equal margins above the horizon and below the near edge.
const BAND: f32 = 0.7;
const MARGIN: f32 = 0.15;

/// Outcome of one tick: whether a draw pass actually ran, and whether the
/// caller should arm the next frame callback.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Step {
    pub(crate) drew: bool,
    pub(crate) rearm: bool,
}

/// The grid of animated dots. Owns the config, the perspective curve and
/// the current dot generation; a relayout discards the generation
/// wholesale and rebuilds it.
pub(crate) struct WaveField {
    config: WaveConfig,
    width: f32,
    height: f32,
    curve: PerspectiveCurve,
    dots: Vec<WaveDot>,
    frame_len: Duration,
    last_frame: Option<Instant>,
}

impl WaveField {
    pub(crate) fn new(config: WaveConfig, width: f32, height: f32) -> Result<Self> {
        config.validate()?;
        // Degenerate grids are legal; the curve always gets at least one row.
        let curve = PerspectiveCurve::compute(config.y_dots.max(1) as usize)?;
        let frame_len = Duration::from_secs_f32(1.0 / config.frame_cap as f32);
        let mut field = Self {
            config,
            width,
            height,
            curve,
            dots: Vec::new(),
            frame_len,
            last_frame: None,
        };
        field.build_layout();
        Ok(field)
    }

    /// Places one generation of dots from the current config, curve and
    /// surface dimensions. Deterministic: same inputs, same anchors.
    pub(crate) fn build_layout(&mut self) {
        let stride = self.config.stride();
        let x_center = self.width * self.config.center_position;
        let depth = self.curve.forward();
        let shared = DotParams {
            dot_size: self.config.dot_size,
            x_dots: self.config.x_dots,
            wave_pattern: self.config.wave_pattern,
            wave_delay: self.config.wave_delay,
            frame_qtd: self.config.frame_qtd,
            wave_max_height: self.config.wave_max_height,
            color: self.config.color,
            backwards: self.config.backwards,
            depth_scale: self.curve.reversed(),
        };

        let mut dots = Vec::new();
        for x_draw in 0..=self.config.x_dots {
            for y_draw in 0..=self.config.y_dots {
                // A point survives if either of its indices sits on the
                // stride, which is what keeps the grid lines populated.
                let hollow = x_draw % stride != 0 && y_draw % stride != 0;
                if hollow {
                    continue;
                }

                let d = depth[y_draw as usize];
                let x_off =
                    (d + self.config.horizon_angle) * (x_draw as f32 * self.config.spacing);
                let y = self.height * BAND * d + self.height * MARGIN;
                let row_depth = (self.config.y_dots - y_draw) as usize;

                dots.push(WaveDot::new(x_center + x_off, y, row_depth, x_draw, &shared));
                // Mirror across the centerline; the centerline itself
                // would only duplicate in place.
                if x_draw != 0 {
                    dots.push(WaveDot::new(x_center - x_off, y, row_depth, x_draw, &shared));
                }
            }
        }
        self.dots = dots;
    }

    /// One animation tick. Early ticks inside the configured frame
    /// interval do no work; an eligible tick clears the surface, redraws
    /// the grid overlay and every dot (advancing each by one step), and
    /// records the frame time. The caller re-arms the next callback iff
    /// `rearm` is set.
    pub(crate) fn step(&mut self, surface: &mut dyn Surface, now: Instant) -> Step {
        let due = match self.last_frame {
            None => true,
            Some(prev) => now.duration_since(prev) > self.frame_len,
        };
        if due {
            surface.clear();
            self.draw_grid(surface);
            for dot in &mut self.dots {
                dot.draw(surface);
            }
            self.last_frame = Some(now);
        }
        Step {
            drew: due,
            rearm: self.config.repeat,
        }
    }

    /// Full rebuild against new surface dimensions; the previous dot
    /// generation is discarded entirely.
    pub(crate) fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.build_layout();
    }

    pub(crate) fn dots(&self) -> &[WaveDot] {
        &self.dots
    }

    fn draw_grid(&self, surface: &mut dyn Surface) {
        let stride = self.config.stride();
        let x_center = self.width * self.config.center_position;
        let half_span = self.config.x_dots as f32 * self.config.spacing;
        let depth = self.curve.forward();

        for y_draw in 0..=self.config.y_dots {
            if y_draw % stride != 0 {
                continue;
            }
            let d = depth[y_draw as usize];
            let x_reach = (d + self.config.horizon_angle) * half_span;
            let y = self.height * BAND * d + self.height * MARGIN;
            surface.stroke_line(
                x_center - x_reach,
                y,
                x_center + x_reach,
                y,
                GRID_WIDTH,
                GRID_COLOR,
            );
        }

        let y_far = self.height * MARGIN;
        let y_near = self.height * BAND + self.height * MARGIN;
        for x_draw in 0..=self.config.x_dots {
            if x_draw % stride != 0 {
                continue;
            }
            let reach = x_draw as f32 * self.config.spacing;
            let x_far = (0.0 + self.config.horizon_angle) * reach;
            let x_near = (1.0 + self.config.horizon_angle) * reach;
            surface.stroke_line(
                x_center - x_far,
                y_far,
                x_center - x_near,
                y_near,
                GRID_WIDTH,
                GRID_COLOR,
            );
            if x_draw > 0 {
                surface.stroke_line(
                    x_center + x_far,
                    y_far,
                    x_center + x_near,
                    y_near,
                    GRID_WIDTH,
                    GRID_COLOR,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WavePattern;
    use crate::render::Pixel;

    #[derive(Default)]
    struct RecordingSurface {
        clears: usize,
        circles: Vec<(f32, f32, f32)>,
        lines: usize,
    }

    impl Surface for RecordingSurface {
        fn clear(&mut self) {
            self.clears += 1;
        }
        fn fill_circle(&mut self, x: f32, y: f32, radius: f32, _color: Pixel) {
            self.circles.push((x, y, radius));
        }
        fn stroke_line(
            &mut self,
            _x0: f32,
            _y0: f32,
            _x1: f32,
            _y1: f32,
            _width: f32,
            _color: Pixel,
        ) {
            self.lines += 1;
        }
    }

    fn config() -> WaveConfig {
        WaveConfig {
            x_dots: 4,
            y_dots: 6,
            spacing: 10.0,
            wave_delay: 1,
            ..WaveConfig::default()
        }
    }

    fn anchors(field: &WaveField) -> Vec<(f32, f32)> {
        field.dots().iter().map(|d| d.anchor()).collect()
    }

    #[test]
    fn layout_is_deterministic() {
        let a = WaveField::new(config(), 800.0, 600.0).unwrap();
        let b = WaveField::new(config(), 800.0, 600.0).unwrap();
        assert_eq!(anchors(&a), anchors(&b));
        assert!(!a.dots().is_empty());
    }

    #[test]
    fn hollow_stride_skips_interior_points() {
        let field = WaveField::new(config(), 800.0, 600.0).unwrap();
        // Count grid points the stride rule keeps, with mirrors for every
        // off-center column.
        let mut expected = 0;
        for x in 0u32..=4 {
            for y in 0u32..=6 {
                if x % 3 != 0 && y % 3 != 0 {
                    continue;
                }
                expected += if x == 0 { 1 } else { 2 };
            }
        }
        assert_eq!(field.dots().len(), expected);
    }

    #[test]
    fn centerline_spawns_a_single_dot_per_row() {
        let cfg = WaveConfig {
            x_dots: 0,
            y_dots: 4,
            hollow_dots: 0,
            ..config()
        };
        let field = WaveField::new(cfg, 800.0, 600.0).unwrap();
        assert_eq!(field.dots().len(), 5);
        for dot in field.dots() {
            assert_eq!(dot.anchor().0, 400.0);
        }
    }

    #[test]
    fn degenerate_grid_is_one_dot_at_the_center_column() {
        let cfg = WaveConfig {
            x_dots: 0,
            y_dots: 0,
            ..WaveConfig::default()
        };
        let field = WaveField::new(cfg, 800.0, 600.0).unwrap();
        assert_eq!(field.dots().len(), 1);
        let (x, y) = field.dots()[0].anchor();
        assert_eq!(x, 400.0);
        // Depth 0 row sits at the horizon-side margin.
        assert!((y - 90.0).abs() < 1e-3);
    }

    #[test]
    fn zero_sized_surface_still_lays_out() {
        let field = WaveField::new(config(), 0.0, 0.0).unwrap();
        assert!(!field.dots().is_empty());
        for dot in field.dots() {
            // All vertical placement collapses onto the zero-height band.
            assert_eq!(dot.anchor().1, 0.0);
        }
    }

    #[test]
    fn first_tick_draws_then_the_cap_gates() {
        let mut field = WaveField::new(config(), 800.0, 600.0).unwrap();
        let mut surface = RecordingSurface::default();
        let t0 = Instant::now();

        let step = field.step(&mut surface, t0);
        assert!(step.drew);
        assert!(step.rearm);
        assert_eq!(surface.clears, 1);
        assert!(surface.lines > 0);
        assert_eq!(surface.circles.len(), field.dots().len());

        // Inside the interval: a no-op that still re-arms.
        let step = field.step(&mut surface, t0 + Duration::from_millis(1));
        assert!(!step.drew);
        assert!(step.rearm);
        assert_eq!(surface.clears, 1);

        // Past the interval (cap defaults to 30 fps): draws again.
        let step = field.step(&mut surface, t0 + Duration::from_millis(40));
        assert!(step.drew);
        assert_eq!(surface.clears, 2);
    }

    #[test]
    fn single_pass_when_repeat_is_off() {
        let cfg = WaveConfig {
            repeat: false,
            ..config()
        };
        let mut field = WaveField::new(cfg, 800.0, 600.0).unwrap();
        let mut surface = RecordingSurface::default();

        let step = field.step(&mut surface, Instant::now());
        assert!(step.drew);
        assert!(!step.rearm);
        assert_eq!(surface.clears, 1);
    }

    #[test]
    fn resize_rebuilds_with_the_same_topology() {
        let mut field = WaveField::new(config(), 800.0, 600.0).unwrap();
        let before = anchors(&field);

        field.resize(400.0, 300.0);
        let after = anchors(&field);

        assert_eq!(before.len(), after.len());
        for ((x0, y0), (x1, y1)) in before.iter().zip(after.iter()) {
            // Vertical placement scales with the surface; horizontal
            // offsets ride on the shifted center column.
            assert!((y1 - y0 * 0.5).abs() < 1e-3);
            assert!(((x1 - 200.0) - (x0 - 400.0)).abs() < 1e-3);
        }
    }

    #[test]
    fn patterns_change_the_stagger_not_the_anchors() {
        let straight = WaveField::new(config(), 800.0, 600.0).unwrap();
        let cfg = WaveConfig {
            wave_pattern: WavePattern::OutsideIn,
            ..config()
        };
        let outside_in = WaveField::new(cfg, 800.0, 600.0).unwrap();
        assert_eq!(anchors(&straight), anchors(&outside_in));
    }
}
