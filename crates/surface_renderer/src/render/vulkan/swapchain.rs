//! Vulkan swapchain management
//!
//! Swapchain creation and recreation. The choice of format, present mode,
//! extent and image count is split into plain functions over the surface's
//! reported capabilities.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use crate::config::PresentModePreference;
use crate::render::vulkan::window_surface::WindowSurface;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Swapchain management wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for `surface` in `format`.
    ///
    /// Pass the handle of the swapchain being replaced as `old_swapchain`, or
    /// a null handle for the first one.
    pub fn new(
        context: &VulkanContext,
        surface: &WindowSurface,
        format: vk::SurfaceFormatKHR,
        requested: vk::Extent2D,
        present_mode: PresentModePreference,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let physical_device = context.physical_device().device;
        let caps = surface.capabilities(physical_device)?;
        let present_mode = choose_present_mode(&surface.present_modes(physical_device)?, present_mode);
        let extent = choose_extent(&caps, requested);

        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: format!("cannot build a {}x{} swapchain", extent.width, extent.height),
            });
        }

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle())
            .min_image_count(choose_image_count(&caps))
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(choose_pre_transform(&caps))
            .composite_alpha(choose_composite_alpha(caps.supported_composite_alpha))
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let device = context.device().clone();
        let loader = context.swapchain_loader().clone();
        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }.map_err(VulkanError::Api)?;

        // Owned from here on, so views created before a failure are released.
        let mut this = Self { device, loader, swapchain, image_views: Vec::new(), extent };

        let images = unsafe { this.loader.get_swapchain_images(swapchain) }.map_err(VulkanError::Api)?;
        for image in images {
            let create_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe { this.device.create_image_view(&create_info, None) }.map_err(VulkanError::Api)?;
            this.image_views.push(view);
        }

        log::debug!(
            "Swapchain created: {}x{}, {} images, {:?}",
            extent.width,
            extent.height,
            this.image_views.len(),
            present_mode
        );
        Ok(this)
    }

    /// Get swapchain extent
    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get swapchain handle
    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get swapchain loader
    pub const fn loader(&self) -> &SwapchainLoader {
        &self.loader
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Prefer 8-bit UNORM BGRA or RGBA so colours reach the screen as written.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> VulkanResult<vk::SurfaceFormatKHR> {
    const PREFERRED: [vk::Format; 2] = [vk::Format::B8G8R8A8_UNORM, vk::Format::R8G8B8A8_UNORM];

    PREFERRED
        .iter()
        .find_map(|wanted| {
            formats
                .iter()
                .find(|sf| sf.format == *wanted && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        })
        .or_else(|| formats.first())
        .copied()
        .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))
}

/// Requested mode if the surface offers it, FIFO otherwise (always available)
pub fn choose_present_mode(available: &[vk::PresentModeKHR], preference: PresentModePreference) -> vk::PresentModeKHR {
    let wanted = match preference {
        PresentModePreference::Fifo => vk::PresentModeKHR::FIFO,
        PresentModePreference::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentModePreference::Immediate => vk::PresentModeKHR::IMMEDIATE,
    };
    if available.contains(&wanted) {
        wanted
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's own extent, or `requested` clamped to its limits when the
/// surface leaves the size to the swapchain.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: requested.width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: requested.height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum when there is one
pub const fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count + 1;
    if caps.max_image_count > 0 && wanted > caps.max_image_count {
        caps.max_image_count
    } else {
        wanted
    }
}

/// Identity when supported so the compositor handles rotation
pub fn choose_pre_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps.supported_transforms.contains(vk::SurfaceTransformFlagsKHR::IDENTITY) {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

/// Whether a present reported suboptimal calls for a new swapchain.
///
/// A swapchain kept at IDENTITY on a rotated Android display is suboptimal on
/// every present; rebuilding at the same extent would not change that, so
/// only a size change counts.
pub fn suboptimal_needs_rebuild(caps: &vk::SurfaceCapabilitiesKHR, current: vk::Extent2D) -> bool {
    caps.current_extent.width != u32::MAX && caps.current_extent != current
}

/// Android surfaces often only offer INHERIT, so take the first supported mode
pub fn choose_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::INHERIT,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    ]
    .into_iter()
    .find(|mode| supported.contains(*mode))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR }
    }

    fn caps(current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: vk::Extent2D { width: current.0, height: current.1 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY | vk::SurfaceTransformFlagsKHR::ROTATE_90,
            current_transform: vk::SurfaceTransformFlagsKHR::ROTATE_90,
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::INHERIT,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_prefers_unorm() {
        let formats = [format(vk::Format::R5G6B5_UNORM_PACK16), format(vk::Format::R8G8B8A8_UNORM)];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::R8G8B8A8_UNORM);

        let only = [format(vk::Format::R5G6B5_UNORM_PACK16)];
        assert_eq!(choose_surface_format(&only).unwrap().format, vk::Format::R5G6B5_UNORM_PACK16);

        assert!(choose_surface_format(&[]).is_err());
    }

    #[test]
    fn test_present_mode_falls_back_to_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes, PresentModePreference::Mailbox), vk::PresentModeKHR::MAILBOX);
        assert_eq!(choose_present_mode(&modes, PresentModePreference::Immediate), vk::PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&modes, PresentModePreference::Fifo), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_follows_surface_or_clamps_request() {
        let requested = vk::Extent2D { width: 8000, height: 600 };
        assert_eq!(choose_extent(&caps((1080, 1920)), requested), vk::Extent2D { width: 1080, height: 1920 });
        assert_eq!(choose_extent(&caps((u32::MAX, u32::MAX)), requested), vk::Extent2D { width: 4096, height: 600 });
    }

    #[test]
    fn test_image_count_respects_maximum() {
        assert_eq!(choose_image_count(&caps((1, 1))), 3);
        let unbounded = vk::SurfaceCapabilitiesKHR { min_image_count: 3, max_image_count: 0, ..Default::default() };
        assert_eq!(choose_image_count(&unbounded), 4);
        let tight = vk::SurfaceCapabilitiesKHR { min_image_count: 3, max_image_count: 3, ..Default::default() };
        assert_eq!(choose_image_count(&tight), 3);
    }

    #[test]
    fn test_transform_and_alpha_for_android_like_surface() {
        let caps = caps((1, 1));
        assert_eq!(choose_pre_transform(&caps), vk::SurfaceTransformFlagsKHR::IDENTITY);
        assert_eq!(choose_composite_alpha(caps.supported_composite_alpha), vk::CompositeAlphaFlagsKHR::INHERIT);
        assert_eq!(choose_composite_alpha(vk::CompositeAlphaFlagsKHR::empty()), vk::CompositeAlphaFlagsKHR::OPAQUE);
    }

    #[test]
    fn test_rotated_surface_at_same_size_keeps_swapchain() {
        let portrait = vk::Extent2D { width: 1080, height: 1920 };
        let rotated = caps((1080, 1920));
        assert_eq!(rotated.current_transform, vk::SurfaceTransformFlagsKHR::ROTATE_90);
        assert!(!suboptimal_needs_rebuild(&rotated, portrait));

        assert!(suboptimal_needs_rebuild(&caps((1920, 1080)), portrait));
        assert!(!suboptimal_needs_rebuild(&caps((u32::MAX, u32::MAX)), portrait));
    }
}
