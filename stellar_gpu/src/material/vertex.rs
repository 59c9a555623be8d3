/// Vertex - interleaved vertex format shared by every material pipeline

use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::graphics_device::{
    Format, VertexAttribute, VertexBinding, VertexInputRate, VertexLayout,
};

/// One vertex: position, normal, uv, tangent, bitangent (56 bytes, no padding)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Single per-vertex binding at index 0, attributes at locations 0..5
    pub fn layout() -> VertexLayout {
        let attribute = |location: u32, format: Format, offset: usize| VertexAttribute {
            location,
            binding: 0,
            format,
            offset: offset as u32,
        };
        VertexLayout {
            bindings: vec![VertexBinding {
                binding: 0,
                stride: Self::STRIDE,
                input_rate: VertexInputRate::Vertex,
            }],
            attributes: vec![
                attribute(0, Format::R32G32B32_SFLOAT, offset_of!(Vertex, position)),
                attribute(1, Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
                attribute(2, Format::R32G32_SFLOAT, offset_of!(Vertex, uv)),
                attribute(3, Format::R32G32B32_SFLOAT, offset_of!(Vertex, tangent)),
                attribute(4, Format::R32G32B32_SFLOAT, offset_of!(Vertex, bitangent)),
            ],
        }
    }
}
