/// Subpass - one graphics subpass of a render pass description

use crate::graphics_device::{AttachmentReference, ImageLayout, PipelineBindPoint};

/// Attachments a subpass writes
///
/// A subpass that writes no color must be marked depth-only and reference a
/// depth attachment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subpass {
    pub bind_point: PipelineBindPoint,
    pub color_attachments: Vec<AttachmentReference>,
    pub depth_attachment: Option<AttachmentReference>,
    pub depth_only: bool,
}

impl Subpass {
    /// Graphics subpass without attachments
    pub fn graphics() -> Self {
        Self::default()
    }

    /// Subpass that only writes depth (shadow maps, depth pre-pass)
    pub fn depth_only(attachment: u32) -> Self {
        Self {
            bind_point: PipelineBindPoint::Graphics,
            color_attachments: Vec::new(),
            depth_attachment: Some(AttachmentReference {
                attachment,
                layout: ImageLayout::DepthStencilAttachment,
            }),
            depth_only: true,
        }
    }

    /// Append a color attachment reference
    pub fn with_color(mut self, attachment: u32) -> Self {
        self.color_attachments.push(AttachmentReference {
            attachment,
            layout: ImageLayout::ColorAttachment,
        });
        self
    }

    /// Set the depth attachment reference
    pub fn with_depth(mut self, attachment: u32) -> Self {
        self.depth_attachment = Some(AttachmentReference {
            attachment,
            layout: ImageLayout::DepthStencilAttachment,
        });
        self
    }

    /// Every attachment index this subpass references
    pub fn referenced_attachments(&self) -> impl Iterator<Item = u32> + '_ {
        self.color_attachments
            .iter()
            .chain(self.depth_attachment.iter())
            .map(|r| r.attachment)
    }
}
