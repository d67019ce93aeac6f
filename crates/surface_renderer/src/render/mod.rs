//! Rendering system
//!
//! The renderer core and everything it drives.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │  Host lifecycle callbacks       │  surfaceCreated / Changed / Destroyed
//! └─────────────┬───────────────────┘
//!               │ attach / resize / detach
//!         ┌─────▼──────┐     present     ┌────────────┐
//!         │  Renderer  │◄────────────────│ RenderLoop │
//!         └─────┬──────┘                 └────────────┘
//!               │ GraphicsBackend trait
//!   ┌───────────▼───────────┐
//!   │ VulkanBackend         │  swapchain on ANativeWindow
//!   │ SoftwareBackend       │  CPU framebuffer
//!   └───────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - **`renderer`**: lifecycle state machine (`Renderer`)
//! - **`backend`**: the contract every graphics backend implements
//! - **`frame`**: backend-neutral frame description
//! - **`scene`**: the animated rectangle-and-line content
//! - **`render_loop`**: worker thread driving `present`
//! - **`surface`**: raw platform surface handles
//! - **`software`** / **`vulkan`**: concrete backends

pub mod backend;
pub mod frame;
pub mod render_loop;
pub mod renderer;
pub mod scene;
pub mod software;
pub mod surface;
pub mod vulkan;

pub use backend::{GraphicsBackend, SurfaceHandle};
pub use frame::{Color, Frame, NdcRect, PixelRect, Primitive};
pub use render_loop::RenderLoop;
pub use renderer::{PresentOutcome, Renderer, RendererState, RendererStats};
pub use scene::SceneAnimator;

use thiserror::Error;

/// Surface or target dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent {
    /// Create a new extent
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero. Nothing can be presented to an empty extent.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// High-level rendering error types
///
/// Backend-specific failures are classified into these kinds so the host only
/// has to know how to recover, never which graphics API produced the error.
/// None of them is fatal: every kind is recovered by re-attaching a surface.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The surface handle passed to `attach` is null, destroyed, or unusable
    ///
    /// Recoverable: the host retries on its next surface-created event.
    #[error("Invalid surface: {0}")]
    InvalidSurface(String),

    /// An operation that needs a bound surface ran outside the Attached state
    ///
    /// Recoverable: the frame is dropped and the caller should re-attach.
    #[error("Cannot {operation} while renderer is {state:?}")]
    NotAttached {
        /// Operation that was refused
        operation: &'static str,
        /// State the renderer was in
        state: RendererState,
    },

    /// The driver invalidated the graphics context
    ///
    /// The renderer tears the context down; the next attach recreates it.
    #[error("Graphics context lost: {0}")]
    ContextLoss(String),

    /// The presentation target no longer matches the surface
    ///
    /// Handled inside the renderer by rebuilding the target.
    #[error("Presentation target out of date")]
    TargetOutOfDate,

    /// Any other backend failure
    #[error("Backend error: {0}")]
    BackendError(String),

    /// The render loop thread could not be started
    #[error("Failed to spawn render thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

impl RenderError {
    /// Whether the error means the surface handle can no longer be used
    pub const fn is_surface_error(&self) -> bool {
        matches!(self, Self::InvalidSurface(_))
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
