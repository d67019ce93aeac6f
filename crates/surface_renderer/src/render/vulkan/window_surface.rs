//! `VkSurfaceKHR` for a native window

use ash::extensions::khr;
use ash::{vk, Entry, Instance};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use crate::render::surface::NativeSurface;
use crate::render::vulkan::{VulkanError, VulkanResult};

/// Vulkan surface wrapper for presentation
pub struct WindowSurface {
    loader: khr::Surface,
    surface: vk::SurfaceKHR,
}

impl WindowSurface {
    /// Create a Vulkan surface for the native window
    pub fn new(entry: &Entry, instance: &Instance, window: &NativeSurface) -> VulkanResult<Self> {
        let loader = khr::Surface::new(entry, instance);

        let surface = unsafe {
            ash_window::create_surface(entry, instance, window.raw_display_handle(), window.raw_window_handle(), None)
        }
        .map_err(VulkanError::Api)?;

        Ok(Self { loader, surface })
    }

    /// Get the underlying surface handle
    pub const fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get surface capabilities for a physical device
    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<vk::SurfaceCapabilitiesKHR> {
        unsafe { self.loader.get_physical_device_surface_capabilities(physical_device, self.surface) }
            .map_err(VulkanError::Api)
    }

    /// Get surface formats for a physical device
    pub fn formats(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe { self.loader.get_physical_device_surface_formats(physical_device, self.surface) }
            .map_err(VulkanError::Api)
    }

    /// Get surface present modes for a physical device
    pub fn present_modes(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<Vec<vk::PresentModeKHR>> {
        unsafe { self.loader.get_physical_device_surface_present_modes(physical_device, self.surface) }
            .map_err(VulkanError::Api)
    }

    /// Check if a queue family supports presentation to this surface
    pub fn supports_present(&self, physical_device: vk::PhysicalDevice, queue_family_index: u32) -> VulkanResult<bool> {
        unsafe {
            self.loader
                .get_physical_device_surface_support(physical_device, queue_family_index, self.surface)
        }
        .map_err(VulkanError::Api)
    }
}

impl Drop for WindowSurface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}
