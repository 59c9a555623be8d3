/// Frame - per-frame-in-flight command buffer, sync objects and render target
///
/// Frames are plain values stored in the swapchain's ring. The in-flight fence
/// is created signaled so the very first wait on it returns immediately.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{CommandBufferHandle, FenceHandle, GraphicsDevice, SemaphoreHandle};
use crate::target::RenderTarget;

pub struct Frame {
    device: Arc<dyn GraphicsDevice>,
    command_buffer: CommandBufferHandle,
    image_available: SemaphoreHandle,
    render_finished: SemaphoreHandle,
    in_flight: FenceHandle,
    render_target: RenderTarget,
}

impl Frame {
    /// Create the sync objects and command buffer around a built render target
    pub(crate) fn new(device: Arc<dyn GraphicsDevice>, render_target: RenderTarget) -> Result<Self> {
        let command_buffer = device.allocate_command_buffer()?;

        // Build incrementally so a failure releases what was already created
        let mut frame = Self {
            device,
            command_buffer,
            image_available: SemaphoreHandle::NULL,
            render_finished: SemaphoreHandle::NULL,
            in_flight: FenceHandle::NULL,
            render_target,
        };
        frame.image_available = frame.device.create_semaphore()?;
        frame.render_finished = frame.device.create_semaphore()?;
        frame.in_flight = frame.device.create_fence(true)?;
        Ok(frame)
    }

    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.command_buffer
    }

    pub fn image_available(&self) -> SemaphoreHandle {
        self.image_available
    }

    pub fn render_finished(&self) -> SemaphoreHandle {
        self.render_finished
    }

    pub fn in_flight(&self) -> FenceHandle {
        self.in_flight
    }

    pub fn render_target(&self) -> &RenderTarget {
        &self.render_target
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.device.destroy_fence(self.in_flight);
        self.device.destroy_semaphore(self.render_finished);
        self.device.destroy_semaphore(self.image_available);
        self.device.free_command_buffer(self.command_buffer);
        // render_target drops after this, destroying its framebuffer
    }
}
