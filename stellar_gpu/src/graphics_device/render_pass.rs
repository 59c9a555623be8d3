/// Render pass attachment, dependency and recording types

use bitflags::bitflags;

use crate::graphics_device::{
    Extent2D, Format, FramebufferHandle, ImageLayout, RenderPassHandle, SampleCount,
};
use crate::render_pass::Subpass;

/// Attachment load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Load existing contents
    Load,
    /// Clear to a value
    Clear,
    /// Don't care about existing contents
    DontCare,
}

/// Attachment store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Store contents after the render pass
    Store,
    /// Don't care about contents after the render pass
    DontCare,
}

/// Description of one render pass attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDescription {
    pub format: Format,
    pub samples: SampleCount,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

impl AttachmentDescription {
    /// Color attachment cleared at load, stored, ending in `final_layout`
    pub fn color(format: Format, final_layout: ImageLayout) -> Self {
        Self {
            format,
            samples: SampleCount::S1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            stencil_load_op: LoadOp::DontCare,
            stencil_store_op: StoreOp::DontCare,
            initial_layout: ImageLayout::Undefined,
            final_layout,
        }
    }

    /// Depth attachment cleared at load; stored only when read afterwards
    pub fn depth(format: Format, store_op: StoreOp, final_layout: ImageLayout) -> Self {
        Self {
            format,
            samples: SampleCount::S1,
            load_op: LoadOp::Clear,
            store_op,
            stencil_load_op: LoadOp::DontCare,
            stencil_store_op: StoreOp::DontCare,
            initial_layout: ImageLayout::Undefined,
            final_layout,
        }
    }
}

/// Reference from a subpass to an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentReference {
    /// Index into the render pass attachment list
    pub attachment: u32,
    /// Layout during the subpass
    pub layout: ImageLayout,
}

/// Pipeline type bound inside a subpass (only graphics subpasses are supported)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineBindPoint {
    #[default]
    Graphics,
}

bitflags! {
    /// Pipeline stages used for synchronization
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const FRAGMENT_SHADER = 1 << 2;
        const EARLY_FRAGMENT_TESTS = 1 << 3;
        const LATE_FRAGMENT_TESTS = 1 << 4;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 5;
        const BOTTOM_OF_PIPE = 1 << 6;
    }
}

bitflags! {
    /// Memory access types used for synchronization
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 1 << 0;
        const COLOR_ATTACHMENT_READ = 1 << 1;
        const COLOR_ATTACHMENT_WRITE = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 4;
    }
}

/// Subpass referenced by a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassIndex {
    /// Work outside the render pass
    External,
    Index(u32),
}

/// Execution/memory dependency between two subpasses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubpassDependency {
    pub src_subpass: SubpassIndex,
    pub dst_subpass: SubpassIndex,
    pub src_stage: PipelineStageFlags,
    pub dst_stage: PipelineStageFlags,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub by_region: bool,
}

/// Render pass creation parameters
#[derive(Debug, Clone, Copy)]
pub struct RenderPassDesc<'a> {
    pub attachments: &'a [AttachmentDescription],
    pub subpasses: &'a [Subpass],
    pub dependencies: &'a [SubpassDependency],
}

// ===== RECORDING =====

/// Clear value for one attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// Viewport transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with depth range [0, 1]
    pub fn from_extent(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Integer rectangle (scissor, render area)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub extent: Extent2D,
}

impl Rect2D {
    pub fn from_extent(extent: Extent2D) -> Self {
        Self { x: 0, y: 0, extent }
    }
}

/// Parameters for beginning a render pass instance
#[derive(Debug, Clone, Copy)]
pub struct RenderPassBeginDesc<'a> {
    pub render_pass: RenderPassHandle,
    pub framebuffer: FramebufferHandle,
    pub render_area: Rect2D,
    /// One entry per attachment, in attachment order
    pub clear_values: &'a [ClearValue],
}
