use crate::config::{Rgb, WavePattern};
use crate::render::{Pixel, Surface};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

/// Parameters shared by every dot of one field generation. Built once per
/// layout; `depth_scale` borrows the field's reversed perspective curve so
/// each dot can derive its own size and amplitude from its row depth.
pub(crate) struct DotParams<'a> {
    pub(crate) dot_size: f32,
    pub(crate) x_dots: u32,
    pub(crate) wave_pattern: WavePattern,
    pub(crate) wave_delay: u32,
    pub(crate) frame_qtd: usize,
    pub(crate) wave_max_height: f32,
    pub(crate) color: Rgb,
    pub(crate) backwards: bool,
    pub(crate) depth_scale: &'a [f32],
}

/// One visible grid point and its oscillation state.
///
/// The displacement curve is precomputed at construction; per frame the
/// dot either counts a hold down (stagger delay, reversal pause, edge
/// easing) or applies the next curve value and moves its frame index one
/// step in the current direction.
pub(crate) struct WaveDot {
    x: f32,
    y: f32,
    original_y: f32,
    radius: f32,
    color: Pixel,
    hold: u32,
    frame_qtd: usize,
    current_frame: usize,
    direction: Direction,
    wave_ceiling: f32,
    frames: Vec<f32>,
}

impl WaveDot {
    pub(crate) fn new(
        x: f32,
        y: f32,
        row_depth: usize,
        col_offset: u32,
        params: &DotParams,
    ) -> Self {
        let depth = params.depth_scale[row_depth];
        let delay = params.wave_delay as f32;

        // Stagger by pattern: straight sweeps row by row; outside-in makes
        // the edge columns lag; inside-out makes the center columns lag.
        let stagger = match params.wave_pattern {
            WavePattern::Straight => row_depth as f32 * delay,
            WavePattern::OutsideIn => {
                row_depth as f32 * delay + col_offset as f32 * (delay * 1.5)
            }
            WavePattern::InsideOut => {
                row_depth as f32 * delay
                    + (params.x_dots - col_offset) as f32 * (delay * 1.5)
            }
        };

        let wave_ceiling = (params.wave_max_height * depth).ceil();
        let frames = build_frames(wave_ceiling, params.frame_qtd);

        let (current_frame, direction) = if params.backwards {
            (params.frame_qtd - 1, Direction::Backward)
        } else {
            (0, Direction::Forward)
        };

        Self {
            x,
            y,
            original_y: y,
            radius: (depth * 10.0).ceil() * params.dot_size,
            color: Pixel {
                r: params.color.r,
                g: params.color.g,
                b: params.color.b,
                a: 255,
            },
            hold: stagger.round() as u32,
            frame_qtd: params.frame_qtd,
            current_frame,
            direction,
            wave_ceiling,
            frames,
        }
    }

    /// Draws the dot at its current position and advances the animation
    /// one step.
    pub(crate) fn draw(&mut self, surface: &mut dyn Surface) {
        surface.fill_circle(self.x, self.y, self.radius, self.color);
        self.advance();
    }

    /// One tick of the hold/forward/backward state machine.
    pub(crate) fn advance(&mut self) {
        if self.hold > 0 {
            self.hold -= 1;
            return;
        }

        // Direction reversal at the curve ends. The return trip waits
        // longer before resuming.
        match self.direction {
            Direction::Forward if self.current_frame == self.frame_qtd - 1 => {
                self.direction = Direction::Backward;
                self.hold = 10;
            }
            Direction::Backward if self.current_frame == 0 => {
                self.direction = Direction::Forward;
                self.hold = 20;
            }
            _ => {}
        }

        self.hold += self.edge_easing();

        self.y = self.original_y + self.frames[self.current_frame];

        // A one-frame curve pins the index; otherwise these clamps never
        // bind, since a flip above already turned the index around.
        match self.direction {
            Direction::Forward => {
                self.current_frame = (self.current_frame + 1).min(self.frame_qtd - 1);
            }
            Direction::Backward => {
                self.current_frame = self.current_frame.saturating_sub(1);
            }
        }
    }

    /// Extra hold ticks near the curve ends, decelerating the dot into
    /// and out of each reversal without warping the precomputed curve.
    fn edge_easing(&self) -> u32 {
        let qtd = self.frame_qtd as f32;
        let frame = self.current_frame as f32;
        if frame < qtd * 0.01 {
            8
        } else if frame < qtd * 0.02 {
            6
        } else if frame < qtd * 0.03 {
            4
        } else if frame < qtd * 0.04 {
            2
        } else if frame < qtd * 0.05 {
            1
        } else if frame < qtd * 0.93 {
            0
        } else if frame < qtd * 0.94 {
            2
        } else if frame < qtd * 0.96 {
            4
        } else if frame < qtd * 0.98 {
            6
        } else if frame < qtd * 0.99 {
            8
        } else {
            10
        }
    }

    #[cfg(test)]
    pub(crate) fn anchor(&self) -> (f32, f32) {
        (self.x, self.original_y)
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    #[cfg(test)]
    pub(crate) fn radius(&self) -> f32 {
        self.radius
    }

    #[cfg(test)]
    pub(crate) fn hold(&self) -> u32 {
        self.hold
    }

    #[cfg(test)]
    pub(crate) fn current_frame(&self) -> usize {
        self.current_frame
    }

    #[cfg(test)]
    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    #[cfg(test)]
    pub(crate) fn frames(&self) -> &[f32] {
        &self.frames
    }

    #[cfg(test)]
    pub(crate) fn wave_ceiling(&self) -> f32 {
        self.wave_ceiling
    }
}

/// Linear ramp from just below zero down to `-wave_ceiling`; the easing at
/// playback time supplies the deceleration, not the curve shape.
fn build_frames(wave_ceiling: f32, frame_qtd: usize) -> Vec<f32> {
    (0..frame_qtd)
        .map(|i| -(wave_ceiling / frame_qtd as f32) * (i as f32 + 1.0))
        .collect()
}
