//! Presentation target: everything bound to one native window
//!
//! Owns the window's `VkSurfaceKHR`, its swapchain, and the per-image and
//! per-frame objects needed to present to it. A target whose window reports
//! an empty extent keeps no swapchain until it is rebuilt at a real size.

use ash::vk;

use crate::config::{PresentModePreference, RendererConfig};
use crate::render::surface::NativeSurface;
use crate::render::vulkan::commands::{CommandPool, CommandRecorder};
use crate::render::vulkan::render_pass::{Framebuffer, RenderPass};
use crate::render::vulkan::swapchain::{choose_surface_format, suboptimal_needs_rebuild, Swapchain};
use crate::render::vulkan::sync::{FrameSync, Semaphore};
use crate::render::vulkan::window_surface::WindowSurface;
use crate::render::vulkan::{to_extent, to_vk_extent, VulkanContext, VulkanError, VulkanResult};
use crate::render::{Extent, Frame};

/// Swapchain plus the objects that depend on its images
struct SwapchainResources {
    // Semaphores signaled when rendering into image `i` finished
    render_finished: Vec<Semaphore>,
    framebuffers: Vec<Framebuffer>,
    swapchain: Swapchain,
}

/// Vulkan presentation target for one window
pub struct VulkanTarget {
    // Field order is drop order: everything before the window surface.
    frames: Vec<FrameSync>,
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: CommandPool,
    resources: Option<SwapchainResources>,
    render_pass: RenderPass,
    format: vk::SurfaceFormatKHR,
    window: WindowSurface,
    present_mode: PresentModePreference,
    current_frame: usize,
    needs_rebuild: bool,
}

impl VulkanTarget {
    /// Bind `native` and build a swapchain at the window's current size.
    pub fn new(context: &VulkanContext, native: &NativeSurface, config: &RendererConfig) -> VulkanResult<Self> {
        let window = WindowSurface::new(context.entry(), context.instance(), native)?;
        if !context.supports(&window)? {
            return Err(VulkanError::SurfaceUnsupported);
        }

        let physical_device = context.physical_device();
        let format = choose_surface_format(&window.formats(physical_device.device)?)?;
        let device = context.device();
        let render_pass = RenderPass::new_present_pass(device.clone(), format.format)?;

        let command_pool = CommandPool::new(device.clone(), physical_device.graphics_family)?;
        let frames_in_flight = config.max_frames_in_flight.max(1);
        let command_buffers = command_pool.allocate_command_buffers(u32::try_from(frames_in_flight).unwrap_or(2))?;
        let frames = command_buffers
            .iter()
            .map(|_| FrameSync::new(device))
            .collect::<VulkanResult<Vec<_>>>()?;

        let mut target = Self {
            frames,
            command_buffers,
            command_pool,
            resources: None,
            render_pass,
            format,
            window,
            present_mode: config.present_mode,
            current_frame: 0,
            needs_rebuild: false,
        };

        let extent = target.query_extent(context)?;
        if extent.is_empty() {
            log::debug!("Window reports {extent}; swapchain deferred until resize");
        } else {
            target.resources = Some(target.build_resources(context, extent, vk::SwapchainKHR::null())?);
        }

        Ok(target)
    }

    /// Extent of the current swapchain, empty when there is none
    pub fn extent(&self) -> Extent {
        self.resources.as_ref().map_or_else(Extent::default, |r| to_extent(r.swapchain.extent()))
    }

    /// Ask the window for its current size.
    ///
    /// Windows that leave the size to the swapchain report the current
    /// swapchain extent, or their minimum extent before the first build.
    pub fn query_extent(&self, context: &VulkanContext) -> VulkanResult<Extent> {
        let caps = self.window.capabilities(context.physical_device().device)?;
        if caps.current_extent.width != u32::MAX {
            return Ok(to_extent(caps.current_extent));
        }
        match &self.resources {
            Some(resources) => Ok(to_extent(resources.swapchain.extent())),
            None => Ok(to_extent(caps.min_image_extent)),
        }
    }

    /// Recreate the swapchain at `extent`, reusing the old one for the handoff.
    pub fn rebuild(&mut self, context: &VulkanContext, extent: Extent, present_mode: PresentModePreference) -> VulkanResult<()> {
        context.wait_idle()?;
        self.present_mode = present_mode;

        let old = self.resources.take();
        if extent.is_empty() {
            log::debug!("Swapchain released for {extent} window");
            return Ok(());
        }

        let old_handle = old.as_ref().map_or_else(vk::SwapchainKHR::null, |r| r.swapchain.handle());
        let resources = self.build_resources(context, extent, old_handle);
        drop(old);

        self.resources = Some(resources?);
        self.needs_rebuild = false;
        Ok(())
    }

    fn build_resources(
        &self,
        context: &VulkanContext,
        extent: Extent,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<SwapchainResources> {
        let device = context.device();
        let swapchain = Swapchain::new(
            context,
            &self.window,
            self.format,
            to_vk_extent(extent),
            self.present_mode,
            old_swapchain,
        )?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| Framebuffer::new(device.clone(), &self.render_pass, view, swapchain.extent()))
            .collect::<VulkanResult<Vec<_>>>()?;

        let render_finished = swapchain
            .image_views()
            .iter()
            .map(|_| Semaphore::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(SwapchainResources { render_finished, framebuffers, swapchain })
    }

    /// Record and submit `frame`, then queue it for presentation.
    ///
    /// `timeout` bounds both the wait for the frame slot and the image
    /// acquire, in nanoseconds.
    pub fn present(&mut self, context: &VulkanContext, frame: &Frame, timeout: u64) -> VulkanResult<()> {
        if self.needs_rebuild {
            return Err(VulkanError::Api(vk::Result::ERROR_OUT_OF_DATE_KHR));
        }
        let Some(resources) = &self.resources else {
            return Ok(());
        };

        let sync = &self.frames[self.current_frame];
        sync.in_flight.wait(timeout)?;

        let swapchain = &resources.swapchain;
        let (image_index, _suboptimal) = unsafe {
            swapchain
                .loader()
                .acquire_next_image(swapchain.handle(), timeout, sync.image_available.handle(), vk::Fence::null())
        }
        .map_err(VulkanError::Api)?;

        // Only reset once work that signals the fence is certain to be submitted.
        sync.in_flight.reset()?;

        let image = image_index as usize;
        let device = context.device();
        let mut recorder = CommandRecorder::begin(device, self.command_buffers[self.current_frame])?;
        recorder.record_frame(
            self.render_pass.handle(),
            resources.framebuffers[image].handle(),
            swapchain.extent(),
            frame,
        );
        let command_buffer = recorder.end()?;

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [resources.render_finished[image].handle()];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe { device.queue_submit(context.graphics_queue(), &[submit_info], sync.in_flight.handle()) }
            .map_err(VulkanError::Api)?;

        let swapchains = [swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let suboptimal = unsafe { swapchain.loader().queue_present(context.present_queue(), &present_info) }
            .map_err(VulkanError::Api)?;

        self.current_frame = (self.current_frame + 1) % self.frames.len();

        if suboptimal {
            // The frame was shown; rebuild before the next one if the size moved.
            let caps = self.window.capabilities(context.physical_device().device)?;
            if suboptimal_needs_rebuild(&caps, swapchain.extent()) {
                log::debug!("Swapchain suboptimal at a new size; rebuilding before next frame");
                self.needs_rebuild = true;
            }
        }
        Ok(())
    }

    /// Wait for the GPU to finish with this target, then release it.
    pub fn destroy(self, context: &VulkanContext) {
        if let Err(e) = context.wait_idle() {
            log::warn!("Device wait before target release failed: {e}");
        }
        drop(self);
    }
}
