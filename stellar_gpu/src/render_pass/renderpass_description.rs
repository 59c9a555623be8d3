/// RenderpassDescription - accumulates attachments, subpasses and
/// dependencies, then builds them into one render pass object
///
/// A description may advertise a default pipeline that materials without a
/// custom shader for this pass reuse instead of building their own.

use crate::cache::PipelineConfig;
use crate::error::Result;
use crate::graphics_device::{
    AccessFlags, AttachmentDescription, Format, GraphicsDevice, ImageLayout, PipelineStageFlags,
    RenderPassDesc, RenderPassHandle, StoreOp, SubpassDependency, SubpassIndex,
};
use crate::log::Log;
use crate::render_pass::Subpass;
use crate::{engine_debug, engine_require};

const SOURCE: &str = "stellar::RenderpassDescription";

/// Name of the pass rendering into the swapchain
pub const MAIN_PASS: &str = "Main";

#[derive(Debug, Clone)]
pub struct RenderpassDescription {
    name: String,
    attachments: Vec<AttachmentDescription>,
    subpasses: Vec<Subpass>,
    dependencies: Vec<SubpassDependency>,
    default_pipeline: Option<PipelineConfig>,
    handle: RenderPassHandle,
}

impl RenderpassDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Vec::new(),
            subpasses: Vec::new(),
            dependencies: Vec::new(),
            default_pipeline: None,
            handle: RenderPassHandle::NULL,
        }
    }

    /// Swapchain pass: color (presented) + depth, one subpass
    pub fn main(color_format: Format, depth_format: Format) -> Self {
        let mut desc = Self::new(MAIN_PASS);
        let color = desc.add_attachment(AttachmentDescription::color(color_format, ImageLayout::PresentSrc));
        let depth = desc.add_attachment(AttachmentDescription::depth(
            depth_format,
            StoreOp::DontCare,
            ImageLayout::DepthStencilAttachment,
        ));
        desc.add_subpass(Subpass::graphics().with_color(color).with_depth(depth));
        desc.add_dependency(SubpassDependency {
            src_subpass: SubpassIndex::External,
            dst_subpass: SubpassIndex::Index(0),
            src_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            dst_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::COLOR_ATTACHMENT_WRITE
                | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            by_region: false,
        });
        desc
    }

    /// Depth-only pass whose result is sampled afterwards (shadow maps)
    pub fn depth_only(name: impl Into<String>, depth_format: Format) -> Self {
        let mut desc = Self::new(name);
        let depth = desc.add_attachment(AttachmentDescription::depth(
            depth_format,
            StoreOp::Store,
            ImageLayout::DepthStencilReadOnly,
        ));
        desc.add_subpass(Subpass::depth_only(depth));
        // Previous frame's sampling must finish before depth is rewritten
        desc.add_dependency(SubpassDependency {
            src_subpass: SubpassIndex::External,
            dst_subpass: SubpassIndex::Index(0),
            src_stage: PipelineStageFlags::FRAGMENT_SHADER,
            dst_stage: PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            src_access: AccessFlags::SHADER_READ,
            dst_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            by_region: true,
        });
        desc.add_dependency(SubpassDependency {
            src_subpass: SubpassIndex::Index(0),
            dst_subpass: SubpassIndex::External,
            src_stage: PipelineStageFlags::LATE_FRAGMENT_TESTS,
            dst_stage: PipelineStageFlags::FRAGMENT_SHADER,
            src_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dst_access: AccessFlags::SHADER_READ,
            by_region: true,
        });
        desc
    }

    // ===== COMPOSITION =====

    /// Append an attachment; returns its index
    pub fn add_attachment(&mut self, attachment: AttachmentDescription) -> u32 {
        self.attachments.push(attachment);
        (self.attachments.len() - 1) as u32
    }

    /// Append a subpass; returns its index
    pub fn add_subpass(&mut self, subpass: Subpass) -> u32 {
        self.subpasses.push(subpass);
        (self.subpasses.len() - 1) as u32
    }

    pub fn add_dependency(&mut self, dependency: SubpassDependency) {
        self.dependencies.push(dependency);
    }

    pub fn set_default_pipeline(&mut self, config: PipelineConfig) {
        self.default_pipeline = Some(config);
    }

    // ===== BUILD =====

    /// Validate references and create the render pass object
    pub fn build(&mut self, device: &dyn GraphicsDevice, log: &Log) -> Result<RenderPassHandle> {
        engine_require!(log, SOURCE, self.handle.is_null(),
            "Render pass '{}' is already built", self.name);
        engine_require!(log, SOURCE, !self.subpasses.is_empty(),
            "Render pass '{}' has no subpass", self.name);
        self.validate(log)?;

        self.handle = device.create_render_pass(&RenderPassDesc {
            attachments: &self.attachments,
            subpasses: &self.subpasses,
            dependencies: &self.dependencies,
        })?;
        engine_debug!(log, SOURCE,
            "Built render pass '{}' ({} attachments, {} subpasses, {} dependencies)",
            self.name, self.attachments.len(), self.subpasses.len(), self.dependencies.len());
        Ok(self.handle)
    }

    fn validate(&self, log: &Log) -> Result<()> {
        let attachment_count = self.attachments.len() as u32;
        for (index, subpass) in self.subpasses.iter().enumerate() {
            for attachment in subpass.referenced_attachments() {
                engine_require!(log, SOURCE, attachment < attachment_count,
                    "Render pass '{}': subpass {} references attachment {} of {}",
                    self.name, index, attachment, attachment_count);
            }
            for reference in &subpass.color_attachments {
                engine_require!(log, SOURCE,
                    !self.attachments[reference.attachment as usize].format.is_depth(),
                    "Render pass '{}': subpass {} uses depth attachment {} as color",
                    self.name, index, reference.attachment);
            }
            if let Some(reference) = subpass.depth_attachment {
                engine_require!(log, SOURCE,
                    self.attachments[reference.attachment as usize].format.is_depth(),
                    "Render pass '{}': subpass {} uses color attachment {} as depth",
                    self.name, index, reference.attachment);
            }
            if subpass.depth_only {
                engine_require!(log, SOURCE,
                    subpass.color_attachments.is_empty() && subpass.depth_attachment.is_some(),
                    "Render pass '{}': depth-only subpass {} must have a depth attachment and no color",
                    self.name, index);
            } else {
                engine_require!(log, SOURCE, !subpass.color_attachments.is_empty(),
                    "Render pass '{}': subpass {} writes no color and is not marked depth-only",
                    self.name, index);
            }
        }

        let subpass_count = self.subpasses.len() as u32;
        for dependency in &self.dependencies {
            let in_range = |index: SubpassIndex| match index {
                SubpassIndex::External => true,
                SubpassIndex::Index(i) => i < subpass_count,
            };
            engine_require!(log, SOURCE,
                in_range(dependency.src_subpass) && in_range(dependency.dst_subpass),
                "Render pass '{}': dependency {:?} -> {:?} references a missing subpass",
                self.name, dependency.src_subpass, dependency.dst_subpass);
            let ordered = match (dependency.src_subpass, dependency.dst_subpass) {
                (SubpassIndex::External, SubpassIndex::External) => false,
                (SubpassIndex::Index(src), SubpassIndex::Index(dst)) => src <= dst,
                _ => true,
            };
            engine_require!(log, SOURCE, ordered,
                "Render pass '{}': dependency {:?} -> {:?} goes backwards",
                self.name, dependency.src_subpass, dependency.dst_subpass);
        }
        Ok(())
    }

    /// Destroy the render pass object; the description can be built again
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        if !self.handle.is_null() {
            device.destroy_render_pass(self.handle);
            self.handle = RenderPassHandle::NULL;
        }
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attachments(&self) -> &[AttachmentDescription] {
        &self.attachments
    }

    pub fn subpasses(&self) -> &[Subpass] {
        &self.subpasses
    }

    pub fn dependencies(&self) -> &[SubpassDependency] {
        &self.dependencies
    }

    pub fn default_pipeline(&self) -> Option<&PipelineConfig> {
        self.default_pipeline.as_ref()
    }

    /// Built handle, `NULL` before `build`
    pub fn handle(&self) -> RenderPassHandle {
        self.handle
    }

    pub fn is_built(&self) -> bool {
        !self.handle.is_null()
    }
}
