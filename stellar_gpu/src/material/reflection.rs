/// Shader reflection data consumed by material synthesis
///
/// Produced outside the core (see `stellar_gpu_vulkan::reflect_spirv` for a
/// SPIR-V implementation, or build it by hand).

use crate::graphics_device::{DescriptorType, ShaderStage};

/// Kind of a bound shader resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Uniform block
    ConstantBuffer,
    /// Read/write storage block
    StructuredBuffer,
    /// Standalone sampler
    Sampler,
    /// Sampled texture
    Texture,
    /// Read/write image
    StorageTexture,
}

impl ResourceKind {
    /// Descriptor type used to bind this kind of resource
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            ResourceKind::ConstantBuffer => DescriptorType::UniformBuffer,
            ResourceKind::StructuredBuffer => DescriptorType::StorageBuffer,
            ResourceKind::Sampler => DescriptorType::Sampler,
            ResourceKind::Texture => DescriptorType::CombinedImageSampler,
            ResourceKind::StorageTexture => DescriptorType::StorageImage,
        }
    }
}

/// One bound resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResource {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub kind: ResourceKind,
    /// Declared type name (struct name for buffers)
    pub type_name: String,
    /// Field inside the block type, when the resource names one
    pub nested_field: Option<String>,
}

impl ShaderResource {
    pub fn new(name: impl Into<String>, set: u32, binding: u32, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            set,
            binding,
            kind,
            type_name: String::new(),
            nested_field: None,
        }
    }
}

/// Shader entry point and its stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub stage: ShaderStage,
}

impl EntryPoint {
    pub fn new(name: impl Into<String>, stage: ShaderStage) -> Self {
        Self { name: name.into(), stage }
    }
}

/// Resources and entry points of one compiled shader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    pub resources: Vec<ShaderResource>,
    pub entry_points: Vec<EntryPoint>,
}

impl ShaderReflection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: ShaderResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_entry_point(mut self, entry_point: EntryPoint) -> Self {
        self.entry_points.push(entry_point);
        self
    }

    /// Entry points as (stage, name) pairs, in declaration order
    pub fn stage_entry_points(&self) -> Vec<(ShaderStage, String)> {
        self.entry_points
            .iter()
            .map(|e| (e.stage, e.name.clone()))
            .collect()
    }
}
