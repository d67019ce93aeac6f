//! Command pool and frame recording
//!
//! Frames are recorded as one render pass whose load op clears to the frame's
//! clear colour, followed by one attachment clear per primitive.

use ash::{vk, Device};

use crate::render::vulkan::{VulkanError, VulkanResult};
use crate::render::{Extent, Frame};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe { device.create_command_pool(&create_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { self.device.allocate_command_buffers(&alloc_info) }.map_err(VulkanError::Api)
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        // Frees every buffer allocated from the pool. Callers wait for the
        // device before dropping a target.
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Records one frame into a command buffer
pub struct CommandRecorder<'a> {
    device: &'a Device,
    command_buffer: vk::CommandBuffer,
}

impl<'a> CommandRecorder<'a> {
    /// Reset `command_buffer` and begin recording into it
    pub fn begin(device: &'a Device, command_buffer: vk::CommandBuffer) -> VulkanResult<Self> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
            device.begin_command_buffer(command_buffer, &begin_info).map_err(VulkanError::Api)?;
        }

        Ok(Self { device, command_buffer })
    }

    /// Record the render pass for `frame`
    pub fn record_frame(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        frame: &Frame,
    ) {
        let clear_values = [vk::ClearValue { color: vk::ClearColorValue { float32: frame.clear_color.to_array() } }];
        let render_area = vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent };
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(&clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);

            for (attachment, rect) in clear_commands(frame, Extent::new(extent.width, extent.height)) {
                self.device.cmd_clear_attachments(self.command_buffer, &[attachment], &[rect]);
            }

            self.device.cmd_end_render_pass(self.command_buffer);
        }
    }

    /// Finish recording
    pub fn end(self) -> VulkanResult<vk::CommandBuffer> {
        unsafe { self.device.end_command_buffer(self.command_buffer) }.map_err(VulkanError::Api)?;
        Ok(self.command_buffer)
    }
}

/// Attachment clears painting the frame's primitives in order.
///
/// Primitives clipped away entirely produce no command.
#[allow(clippy::cast_possible_wrap)]
pub fn clear_commands(frame: &Frame, extent: Extent) -> Vec<(vk::ClearAttachment, vk::ClearRect)> {
    frame
        .primitives
        .iter()
        .filter_map(|primitive| {
            let px = primitive.to_pixels(extent)?;
            let attachment = vk::ClearAttachment {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                color_attachment: 0,
                clear_value: vk::ClearValue {
                    color: vk::ClearColorValue { float32: primitive.color().to_array() },
                },
            };
            let rect = vk::ClearRect {
                rect: vk::Rect2D {
                    offset: vk::Offset2D { x: px.x as i32, y: px.y as i32 },
                    extent: vk::Extent2D { width: px.width, height: px.height },
                },
                base_array_layer: 0,
                layer_count: 1,
            };
            Some((attachment, rect))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Color, NdcRect, SceneAnimator};

    #[test]
    fn test_scene_rect_becomes_centre_clear() {
        let frame = SceneAnimator::default().frame();
        let commands = clear_commands(&frame, Extent::new(1080, 1920));

        let (attachment, rect) = commands[0];
        assert_eq!(attachment.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(rect.rect.offset, vk::Offset2D { x: 270, y: 480 });
        assert_eq!(rect.rect.extent, vk::Extent2D { width: 540, height: 960 });
        assert_eq!(unsafe { attachment.clear_value.color.float32 }, [1.0, 1.0, 1.0, 1.0]);

        // Every line segment is one row high
        assert!(commands[1..].iter().all(|(_, r)| r.rect.extent.height == 1));
    }

    #[test]
    fn test_clipped_primitives_are_skipped() {
        let mut frame = Frame::default();
        frame.push_rect(NdcRect::new(2.0, 2.0, 3.0, 3.0), Color::WHITE);
        frame.push_hline(-1.0, 1.0, 5.0, Color::WHITE);
        assert!(clear_commands(&frame, Extent::new(100, 100)).is_empty());
    }
}
