/// Descriptor set layout, pool and write types

use crate::graphics_device::{
    BufferHandle, BufferRegion, DescriptorSetHandle, ImageLayout, ImageViewHandle,
    SamplerHandle, ShaderStageFlags,
};

/// Descriptor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    InputAttachment,
}

impl DescriptorType {
    /// True for types written from a buffer region
    pub fn is_buffer(&self) -> bool {
        matches!(self, DescriptorType::UniformBuffer | DescriptorType::StorageBuffer)
    }
}

/// One binding slot of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    /// Array size (1 for non-arrays)
    pub count: u32,
    pub stage_flags: ShaderStageFlags,
}

/// Descriptor count reserved in a pool for one type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorPoolSize {
    pub descriptor_type: DescriptorType,
    pub count: u32,
}

/// Resource bound by a descriptor write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorResource {
    /// Buffer region (uniform/storage buffers)
    Buffer(BufferRegion),
    /// Image binding (sampled images, combined samplers, storage images)
    Image {
        view: ImageViewHandle,
        sampler: SamplerHandle,
        layout: ImageLayout,
    },
}

/// Write targeting one binding of a yet-unspecified set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorUpdate {
    pub binding: u32,
    pub array_element: u32,
    pub descriptor_type: DescriptorType,
    pub resource: DescriptorResource,
}

impl DescriptorUpdate {
    /// Whole-range buffer write at array element 0
    pub fn buffer(
        binding: u32,
        descriptor_type: DescriptorType,
        buffer: BufferHandle,
        offset: u64,
        range: u64,
    ) -> Self {
        Self {
            binding,
            array_element: 0,
            descriptor_type,
            resource: DescriptorResource::Buffer(BufferRegion { buffer, offset, range }),
        }
    }

    /// Image write at array element 0
    pub fn image(
        binding: u32,
        descriptor_type: DescriptorType,
        view: ImageViewHandle,
        sampler: SamplerHandle,
        layout: ImageLayout,
    ) -> Self {
        Self {
            binding,
            array_element: 0,
            descriptor_type,
            resource: DescriptorResource::Image { view, sampler, layout },
        }
    }

    /// Bind this update to a concrete set
    pub fn to_set(self, set: DescriptorSetHandle) -> DescriptorWrite {
        DescriptorWrite { set, update: self }
    }
}

/// Write targeting one binding of a concrete set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite {
    pub set: DescriptorSetHandle,
    pub update: DescriptorUpdate,
}
