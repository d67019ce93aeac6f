//! Vulkan backend
//!
//! Presents frames to a native window through a swapchain. The context
//! (instance, physical and logical device) is created once and survives
//! surface recreation; everything tied to one window lives in a
//! [`VulkanTarget`].
//!
//! Frames are drawn without a graphics pipeline: the render pass clears to the
//! frame's clear colour and each primitive is painted with
//! `vkCmdClearAttachments` over its pixel rectangle.

pub mod commands;
pub mod context;
pub mod render_pass;
pub mod swapchain;
pub mod sync;
pub mod target;
pub mod window_surface;

pub use context::VulkanContext;
pub use target::VulkanTarget;

use ash::vk;
use thiserror::Error;

use crate::config::RendererConfig;
use crate::render::surface::NativeSurface;
use crate::render::{Extent, Frame, GraphicsBackend, RenderError, RenderResult};

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// The selected device cannot present to this window
    #[error("Device cannot present to this surface")]
    SurfaceUnsupported,
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

impl From<VulkanError> for RenderError {
    fn from(err: VulkanError) -> Self {
        match err {
            VulkanError::Api(vk::Result::ERROR_SURFACE_LOST_KHR | vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR) => {
                Self::InvalidSurface(err.to_string())
            }
            VulkanError::SurfaceUnsupported => Self::InvalidSurface(err.to_string()),
            VulkanError::Api(vk::Result::ERROR_DEVICE_LOST) => Self::ContextLoss(err.to_string()),
            VulkanError::Api(vk::Result::ERROR_OUT_OF_DATE_KHR | vk::Result::SUBOPTIMAL_KHR) => {
                Self::TargetOutOfDate
            }
            VulkanError::Api(_) | VulkanError::InvalidOperation { .. } | VulkanError::InitializationFailed(_) => {
                Self::BackendError(err.to_string())
            }
        }
    }
}

pub(crate) const fn to_extent(extent: vk::Extent2D) -> Extent {
    Extent::new(extent.width, extent.height)
}

pub(crate) const fn to_vk_extent(extent: Extent) -> vk::Extent2D {
    vk::Extent2D { width: extent.width, height: extent.height }
}

/// Graphics backend presenting through Vulkan swapchains
pub struct VulkanBackend {
    config: RendererConfig,
}

impl VulkanBackend {
    /// Create the backend. No Vulkan calls are made until the first attach.
    pub const fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Configuration the backend was created with
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }
}

impl GraphicsBackend for VulkanBackend {
    type Surface = NativeSurface;
    type Context = VulkanContext;
    type Target = VulkanTarget;

    fn name(&self) -> &'static str {
        "Vulkan"
    }

    fn create_context(&mut self, surface: &NativeSurface) -> RenderResult<VulkanContext> {
        Ok(VulkanContext::new(&self.config, surface)?)
    }

    fn create_target(&mut self, context: &mut VulkanContext, surface: &NativeSurface) -> RenderResult<VulkanTarget> {
        Ok(VulkanTarget::new(context, surface, &self.config)?)
    }

    fn target_extent(&self, target: &VulkanTarget) -> Extent {
        target.extent()
    }

    fn query_extent(&self, context: &VulkanContext, target: &VulkanTarget) -> RenderResult<Extent> {
        Ok(target.query_extent(context)?)
    }

    fn rebuild_target(&mut self, context: &mut VulkanContext, target: &mut VulkanTarget, extent: Extent) -> RenderResult<()> {
        Ok(target.rebuild(context, extent, self.config.present_mode)?)
    }

    fn present(&mut self, context: &mut VulkanContext, target: &mut VulkanTarget, frame: &Frame) -> RenderResult<()> {
        Ok(target.present(context, frame, self.config.frame_timeout_ns())?)
    }

    fn destroy_target(&mut self, context: &mut VulkanContext, target: VulkanTarget) {
        target.destroy(context);
    }

    fn destroy_context(&mut self, context: VulkanContext) {
        drop(context);
    }
}
