//! # Surface Renderer
//!
//! Native renderer core driven by a host's surface lifecycle callbacks.
//!
//! The host (an Android `SurfaceView` shell) owns the drawable surface and
//! tells the renderer when it appears, changes size and goes away. The
//! renderer keeps its graphics context alive across those events and only
//! rebuilds what is bound to the surface.
//!
//! ## Features
//!
//! - **Lifecycle state machine**: attach / resize / detach / present guarded by one lock
//! - **Vulkan backend**: swapchain presentation to `ANativeWindow` surfaces
//! - **Software backend**: CPU framebuffer for tools and tests
//! - **Render loop**: worker thread with synchronous stop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use surface_renderer::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let surface = SoftwareSurface::new(Extent::new(640, 480));
//!     let renderer = Arc::new(Renderer::new(SoftwareBackend::new()));
//!
//!     // surfaceCreated
//!     renderer.attach(surface.clone())?;
//!
//!     let render_loop = RenderLoop::spawn(
//!         Arc::clone(&renderer),
//!         SceneAnimator::new(SceneConfig::default()),
//!         Duration::from_millis(16),
//!     )?;
//!
//!     // surfaceChanged
//!     surface.set_extent(Extent::new(480, 640));
//!     renderer.resize()?;
//!
//!     // surfaceDestroyed
//!     renderer.detach();
//!     render_loop.stop();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

pub use render::{
    Extent, Frame, GraphicsBackend, PresentOutcome, RenderError, RenderResult, Renderer,
    RendererState, RendererStats,
};

/// Human-readable identification shown by the host UI.
///
/// Display only; carries no contract beyond being static text. Names no
/// backend, since one build can drive either.
pub fn identification() -> &'static str {
    concat!("surface_renderer ", env!("CARGO_PKG_VERSION"))
}

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, PresentModePreference, RendererConfig, SceneConfig},
        identification,
        render::{
            Color, Extent, Frame, GraphicsBackend, NdcRect, PresentOutcome, Primitive, RenderError,
            RenderLoop, RenderResult, Renderer, RendererState, RendererStats, SceneAnimator,
            SurfaceHandle,
            software::{SoftwareBackend, SoftwareSurface},
            surface::NativeSurface,
            vulkan::VulkanBackend,
        },
    };
}
