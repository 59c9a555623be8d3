/// RenderTarget - ordered attachments plus the framebuffer built from them
///
/// The framebuffer is derived state: `build` creates it against a render pass,
/// `cleanup` destroys it and leaves the attachments alone. Attachment
/// lifetimes are managed by their own `Arc` reference counts.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    Extent2D, FramebufferHandle, GraphicsDevice, ImageViewHandle, RenderPassHandle,
};
use crate::log::Log;
use crate::target::RenderTargetAttachment;
use crate::engine_require;

pub struct RenderTarget {
    device: Arc<dyn GraphicsDevice>,
    log: Log,
    extent: Extent2D,
    attachments: Vec<Arc<RenderTargetAttachment>>,
    framebuffer: Option<FramebufferHandle>,
}

impl RenderTarget {
    pub fn new(device: Arc<dyn GraphicsDevice>, log: Log, extent: Extent2D) -> Self {
        Self {
            device,
            log,
            extent,
            attachments: Vec::new(),
            framebuffer: None,
        }
    }

    /// Append an attachment; its position is its attachment index
    pub fn add_attachment(&mut self, attachment: Arc<RenderTargetAttachment>) -> u32 {
        self.attachments.push(attachment);
        (self.attachments.len() - 1) as u32
    }

    /// Create the framebuffer from the attachment views, in registration order
    ///
    /// Rebuilding an already built target replaces its framebuffer.
    pub fn build(&mut self, render_pass: RenderPassHandle) -> Result<FramebufferHandle> {
        engine_require!(self.log, "stellar::RenderTarget",
            !self.attachments.is_empty(),
            "Cannot build a render target without attachments");
        engine_require!(self.log, "stellar::RenderTarget",
            !self.extent.is_zero(),
            "Cannot build a render target with zero extent");
        for (index, attachment) in self.attachments.iter().enumerate() {
            let size = attachment.extent();
            engine_require!(self.log, "stellar::RenderTarget",
                size.width >= self.extent.width && size.height >= self.extent.height,
                "Attachment {} ({}x{}) is smaller than the render target ({}x{})",
                index, size.width, size.height, self.extent.width, self.extent.height);
        }

        self.cleanup();

        let views: Vec<ImageViewHandle> = self.attachments.iter().map(|a| a.view()).collect();
        let framebuffer = self.device.create_framebuffer(render_pass, &views, self.extent)?;
        self.framebuffer = Some(framebuffer);
        Ok(framebuffer)
    }

    /// Destroy the framebuffer only
    pub fn cleanup(&mut self) {
        if let Some(framebuffer) = self.framebuffer.take() {
            self.device.destroy_framebuffer(framebuffer);
        }
    }

    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }

    pub fn attachments(&self) -> &[Arc<RenderTargetAttachment>] {
        &self.attachments
    }

    pub fn attachment(&self, index: usize) -> Option<&Arc<RenderTargetAttachment>> {
        self.attachments.get(index)
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.cleanup();
    }
}
