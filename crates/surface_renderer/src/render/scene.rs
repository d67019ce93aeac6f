//! Animated scene content
//!
//! A centred rectangle and a horizontal line that scrolls from left to right.
//! The line's alpha follows a fixed screen-space gradient, fully opaque at
//! the left edge and fully transparent at the right edge, so the line fades
//! as it travels. The gradient is approximated by flat segments and
//! composited against what lies beneath on the CPU.

use crate::config::SceneConfig;
use crate::render::{Color, Frame, NdcRect};

/// Rectangle covered by the scene's centred quad
const RECT: NdcRect = NdcRect { x0: -0.5, y0: -0.5, x1: 0.5, y1: 0.5 };

/// Vertical position of the scrolling line
const LINE_Y: f32 = 0.0;

/// Length of the line in NDC units
const LINE_LENGTH: f32 = 2.0;

/// Produces one [`Frame`] per presented frame and advances the line animation.
#[derive(Debug, Clone)]
pub struct SceneAnimator {
    config: SceneConfig,
    offset: f32,
}

impl SceneAnimator {
    /// Create an animator at the start of the animation
    pub const fn new(config: SceneConfig) -> Self {
        Self { config, offset: 0.0 }
    }

    /// Current line offset, always within [0, 2]
    pub const fn offset(&self) -> f32 {
        self.offset
    }

    /// Advance the animation by one frame.
    pub fn advance(&mut self) {
        self.offset += self.config.line_step;
        if self.offset > LINE_LENGTH {
            self.offset -= LINE_LENGTH;
        }
    }

    /// Line alpha at screen x
    pub fn line_alpha(x: f32) -> f32 {
        (1.0 - (x + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    /// Build the frame for the current animation position.
    pub fn frame(&self) -> Frame {
        let clear = Color::from_array(self.config.clear_color);
        let rect_color = Color::from_array(self.config.rect_color).with_alpha(1.0);

        let mut frame = Frame::new(clear);
        frame.push_rect(RECT, rect_color);

        let start = (self.offset - LINE_LENGTH).max(-1.0);
        let end = self.offset.min(1.0);
        if end <= start {
            return frame;
        }

        let [r, g, b] = self.config.line_color;
        let line = Color::rgba(r, g, b, 1.0);

        let breaks = self.breakpoints(start, end);
        for pair in breaks.windows(2) {
            let (x0, x1) = (pair[0], pair[1]);
            let mid = (x0 + x1) * 0.5;
            let under = if RECT.contains(mid, LINE_Y) { rect_color } else { clear };
            let color = line.with_alpha(Self::line_alpha(mid)).over(under);
            frame.push_hline(x0, x1, LINE_Y, color);
        }

        frame
    }

    /// Segment boundaries inside [start, end]: the fixed gradient grid plus
    /// the rectangle edges, so no segment straddles a background change.
    #[allow(clippy::cast_precision_loss)]
    fn breakpoints(&self, start: f32, end: f32) -> Vec<f32> {
        let segments = self.config.line_segments.max(1);
        let step = 2.0 / segments as f32;

        let mut breaks: Vec<f32> = (0..=segments)
            .map(|k| -1.0 + k as f32 * step)
            .chain([RECT.x0, RECT.x1])
            .filter(|x| *x > start && *x < end)
            .chain([start, end])
            .collect();
        breaks.sort_by(f32::total_cmp);
        breaks.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        breaks
    }
}

impl Default for SceneAnimator {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}
