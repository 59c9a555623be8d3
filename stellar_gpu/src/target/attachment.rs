/// RenderTargetAttachment - one image + view usable as a framebuffer attachment
///
/// An attachment either owns its image (allocated here, destroyed on drop) or
/// borrows one owned elsewhere, typically a swapchain image. Borrowed images
/// are never destroyed by the attachment; only the view created for them is.
/// Attachments are shared between render targets through `Arc`, so a depth
/// buffer used by every frame is destroyed exactly once, when the last target
/// referencing it goes away.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    AllocatedImage, Extent2D, Format, GraphicsDevice, ImageAspect, ImageDesc, ImageHandle,
    ImageUsage, ImageViewDesc, ImageViewHandle, MemoryHandle, SamplerDesc, SamplerHandle,
};

/// Parameters for an owned attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub extent: Extent2D,
    pub format: Format,
    pub usage: ImageUsage,
    /// Optional sampler, for attachments read by later passes (e.g. depth maps)
    pub sampler: Option<SamplerDesc>,
}

impl AttachmentDesc {
    /// Depth attachment used only during rendering
    pub fn depth(extent: Extent2D, format: Format) -> Self {
        Self {
            extent,
            format,
            usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            sampler: None,
        }
    }

    /// Depth attachment sampled afterwards through a comparison sampler
    pub fn sampled_depth(extent: Extent2D, format: Format) -> Self {
        Self {
            extent,
            format,
            usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED,
            sampler: Some(SamplerDesc::shadow()),
        }
    }

    /// Color attachment sampled afterwards
    pub fn sampled_color(extent: Extent2D, format: Format) -> Self {
        Self {
            extent,
            format,
            usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
            sampler: Some(SamplerDesc::default()),
        }
    }
}

pub struct RenderTargetAttachment {
    device: Arc<dyn GraphicsDevice>,
    image: ImageHandle,
    view: ImageViewHandle,
    /// Present only for owned images
    memory: Option<MemoryHandle>,
    sampler: Option<SamplerHandle>,
    owns_image: bool,
    format: Format,
    extent: Extent2D,
}

impl RenderTargetAttachment {
    /// Allocate an owned image, its memory and view (and sampler if requested)
    pub fn allocate(device: Arc<dyn GraphicsDevice>, desc: &AttachmentDesc) -> Result<Self> {
        let AllocatedImage { image, memory } = device.create_image(&ImageDesc {
            extent: desc.extent,
            format: desc.format,
            usage: desc.usage,
        })?;

        let view = match device.create_image_view(&ImageViewDesc {
            image,
            format: desc.format,
            aspect: ImageAspect::for_format(desc.format),
        }) {
            Ok(view) => view,
            Err(e) => {
                device.destroy_image(image);
                device.free_memory(memory);
                return Err(e);
            }
        };

        let sampler = match desc.sampler.as_ref().map(|s| device.create_sampler(s)).transpose() {
            Ok(sampler) => sampler,
            Err(e) => {
                device.destroy_image_view(view);
                device.destroy_image(image);
                device.free_memory(memory);
                return Err(e);
            }
        };

        Ok(Self {
            device,
            image,
            view,
            memory: Some(memory),
            sampler,
            owns_image: true,
            format: desc.format,
            extent: desc.extent,
        })
    }

    /// Wrap an image owned elsewhere (only a view is created)
    pub fn borrow_image(
        device: Arc<dyn GraphicsDevice>,
        image: ImageHandle,
        format: Format,
        extent: Extent2D,
    ) -> Result<Self> {
        let view = device.create_image_view(&ImageViewDesc {
            image,
            format,
            aspect: ImageAspect::for_format(format),
        })?;

        Ok(Self {
            device,
            image,
            view,
            memory: None,
            sampler: None,
            owns_image: false,
            format,
            extent,
        })
    }

    pub fn image(&self) -> ImageHandle {
        self.image
    }

    pub fn view(&self) -> ImageViewHandle {
        self.view
    }

    pub fn sampler(&self) -> Option<SamplerHandle> {
        self.sampler
    }

    pub fn owns_image(&self) -> bool {
        self.owns_image
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}

impl Drop for RenderTargetAttachment {
    fn drop(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            self.device.destroy_sampler(sampler);
        }
        self.device.destroy_image_view(self.view);
        if self.owns_image {
            self.device.destroy_image(self.image);
        }
        if let Some(memory) = self.memory.take() {
            self.device.free_memory(memory);
        }
    }
}
