//! Backend abstraction traits for the rendering system
//!
//! This module defines the traits that graphics backends implement so the
//! renderer state machine can drive them without knowing the graphics API.
//!
//! The split between `Context` and `Target` is what lets the renderer survive
//! surface recreation: the context is the API connection and outlives any
//! surface, the target is everything bound to one surface at one size.

use crate::render::{Extent, Frame, RenderResult};

/// Host-owned reference to a drawable target.
///
/// The renderer holds a surface only between `attach` and `detach`.
pub trait SurfaceHandle: Send {
    /// Reject handles that can never be attached (null, already destroyed).
    fn validate(&self) -> RenderResult<()>;
}

/// Graphics backend driven by [`crate::render::Renderer`].
///
/// All methods are called with the renderer lock held, so implementations do
/// not need their own synchronization.
pub trait GraphicsBackend: Send {
    /// Surface type the host hands to `attach`
    type Surface: SurfaceHandle;
    /// Long-lived graphics API connection
    type Context: Send;
    /// Everything bound to one surface at one size
    type Target: Send;

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Create the graphics context.
    ///
    /// The surface is only used to choose a device able to present to it; the
    /// returned context must not keep a reference to it.
    fn create_context(&mut self, surface: &Self::Surface) -> RenderResult<Self::Context>;

    /// Build a presentation target sized to the surface's current dimensions.
    fn create_target(
        &mut self,
        context: &mut Self::Context,
        surface: &Self::Surface,
    ) -> RenderResult<Self::Target>;

    /// Extent the target was last built for
    fn target_extent(&self, target: &Self::Target) -> Extent;

    /// Ask the surface bound to `target` for its current dimensions.
    fn query_extent(&self, context: &Self::Context, target: &Self::Target) -> RenderResult<Extent>;

    /// Rebuild the target at `extent`, keeping its surface binding.
    fn rebuild_target(
        &mut self,
        context: &mut Self::Context,
        target: &mut Self::Target,
        extent: Extent,
    ) -> RenderResult<()>;

    /// Render `frame` and submit it to the target.
    fn present(
        &mut self,
        context: &mut Self::Context,
        target: &mut Self::Target,
        frame: &Frame,
    ) -> RenderResult<()>;

    /// Release the target. Must wait for any GPU work that uses it.
    fn destroy_target(&mut self, context: &mut Self::Context, target: Self::Target);

    /// Release the context. All targets are already destroyed.
    fn destroy_context(&mut self, context: Self::Context);
}
