//! Backend-neutral frame description
//!
//! A frame is a clear colour plus an ordered list of axis-aligned primitives
//! in normalized device coordinates (x and y in [-1, 1], y pointing up).
//! Primitives are opaque; any blending is resolved before they reach a
//! backend, so every backend can paint them as plain pixel rectangles.

use crate::render::Extent;

/// Linear RGBA colour with channels in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Color {
    /// Opaque black
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Opaque white
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Create a colour from channels
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a colour from an `[r, g, b, a]` array
    pub const fn from_array(c: [f32; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }

    /// Channels as an `[r, g, b, a]` array
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Same colour with a different alpha
    #[must_use]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Composite `self` over an opaque `under` colour (source-over blending).
    ///
    /// The result is opaque.
    #[must_use]
    pub fn over(self, under: Self) -> Self {
        let a = self.a.clamp(0.0, 1.0);
        let mix = |src: f32, dst: f32| src * a + dst * (1.0 - a);
        Self::rgba(mix(self.r, under.r), mix(self.g, under.g), mix(self.b, under.b), 1.0)
    }

    /// Quantize to 8-bit RGBA
    pub fn to_rgba8(self) -> [u8; 4] {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Axis-aligned rectangle in normalized device coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NdcRect {
    /// Left edge
    pub x0: f32,
    /// Bottom edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Top edge
    pub y1: f32,
}

impl NdcRect {
    /// Create a rectangle from two corners in any order
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0: x0.min(x1), y0: y0.min(y1), x1: x0.max(x1), y1: y0.max(y1) }
    }

    /// Whether the point lies inside or on the edge
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }
}

/// Rectangle in framebuffer pixels, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left column
    pub x: u32,
    /// Top row
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// A single opaque shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// Filled rectangle
    Rect {
        /// Covered area
        rect: NdcRect,
        /// Fill colour
        color: Color,
    },
    /// One-pixel-high horizontal line segment
    HLine {
        /// Start x
        x0: f32,
        /// End x
        x1: f32,
        /// Vertical position
        y: f32,
        /// Line colour
        color: Color,
    },
}

impl Primitive {
    /// Colour the primitive is painted with
    pub const fn color(&self) -> Color {
        match self {
            Self::Rect { color, .. } | Self::HLine { color, .. } => *color,
        }
    }

    /// Map to pixels for a target of `extent`, clipped to the target.
    ///
    /// Returns `None` when nothing remains after clipping.
    pub fn to_pixels(&self, extent: Extent) -> Option<PixelRect> {
        if extent.is_empty() {
            return None;
        }

        let (left, right, top, bottom) = match *self {
            Self::Rect { rect, .. } => (
                ndc_to_column(rect.x0, extent.width),
                ndc_to_column(rect.x1, extent.width),
                ndc_to_row(rect.y1, extent.height),
                ndc_to_row(rect.y0, extent.height),
            ),
            Self::HLine { x0, x1, y, .. } => {
                if !(-1.0..=1.0).contains(&y) {
                    return None;
                }
                let row = ndc_to_row(y, extent.height).min(extent.height - 1);
                (
                    ndc_to_column(x0.min(x1), extent.width),
                    ndc_to_column(x0.max(x1), extent.width),
                    row,
                    row + 1,
                )
            }
        };

        if right <= left || bottom <= top {
            return None;
        }

        Some(PixelRect { x: left, y: top, width: right - left, height: bottom - top })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn ndc_to_column(x: f32, width: u32) -> u32 {
    let px = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * width as f32;
    (px.round() as u32).min(width)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn ndc_to_row(y: f32, height: u32) -> u32 {
    let py = (1.0 - y.clamp(-1.0, 1.0)) * 0.5 * height as f32;
    (py.round() as u32).min(height)
}

/// Content for one present
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Colour every pixel starts with
    pub clear_color: Color,
    /// Shapes painted in order over the clear colour
    pub primitives: Vec<Primitive>,
}

impl Frame {
    /// Empty frame with a clear colour
    pub const fn new(clear_color: Color) -> Self {
        Self { clear_color, primitives: Vec::new() }
    }

    /// Append a filled rectangle
    pub fn push_rect(&mut self, rect: NdcRect, color: Color) {
        self.primitives.push(Primitive::Rect { rect, color });
    }

    /// Append a horizontal line segment
    pub fn push_hline(&mut self, x0: f32, x1: f32, y: f32, color: Color) {
        self.primitives.push(Primitive::HLine { x0, x1, y, color });
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(Color::BLACK)
    }
}
