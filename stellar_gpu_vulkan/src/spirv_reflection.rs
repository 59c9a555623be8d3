//! SPIR-V reflection - builds a `ShaderReflection` from compiled shader code
//!
//! Resources referenced by several entry points are reported once, keyed by
//! (set, binding). Entry points of non-graphics stages are skipped.

use std::path::Path;

use spirq::spirv::ExecutionModel;
use spirq::ty::{DescriptorType, Type};
use spirq::var::Variable;
use stellar_gpu::cache::read_spirv;
use stellar_gpu::graphics_device::ShaderStage;
use stellar_gpu::material::{EntryPoint, ResourceKind, ShaderReflection, ShaderResource};
use stellar_gpu::{Error, Result};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Words in a SPIR-V module header
const SPIRV_HEADER_WORDS: usize = 5;

/// Reflect bound resources and entry points of a SPIR-V module
pub fn reflect_spirv(code: &[u32]) -> Result<ShaderReflection> {
    // spirq slices the header without checking the length
    if code.len() < SPIRV_HEADER_WORDS {
        return Err(Error::InvalidResource(format!(
            "SPIR-V module too short: {} words, header needs {}",
            code.len(),
            SPIRV_HEADER_WORDS
        )));
    }
    if code[0] != SPIRV_MAGIC {
        return Err(Error::InvalidResource(format!(
            "Not a SPIR-V module: magic number {:#010x}",
            code[0]
        )));
    }

    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| Error::InvalidResource(format!("SPIR-V reflection failed: {:?}", e)))?;

    let mut reflection = ShaderReflection::new();
    for entry_point in &entry_points {
        if let Some(stage) = stage_from_execution_model(entry_point.exec_model) {
            reflection = reflection.with_entry_point(EntryPoint::new(entry_point.name.clone(), stage));
        }

        for var in &entry_point.vars {
            let Variable::Descriptor { name, desc_bind, desc_ty, ty, .. } = var else {
                continue;
            };
            let (set, binding) = (desc_bind.set(), desc_bind.bind());
            if reflection.resources.iter().any(|r| r.set == set && r.binding == binding) {
                continue;
            }

            let mut resource = ShaderResource::new(
                name.clone().unwrap_or_default(),
                set,
                binding,
                resource_kind(desc_ty)?,
            );
            resource.type_name = type_name(ty);
            reflection.resources.push(resource);
        }
    }

    Ok(reflection)
}

/// Read a `.spv` file and reflect it
pub fn reflect_spirv_file(path: impl AsRef<Path>) -> Result<ShaderReflection> {
    reflect_spirv(&read_spirv(path.as_ref())?)
}

fn resource_kind(desc_ty: &DescriptorType) -> Result<ResourceKind> {
    match desc_ty {
        DescriptorType::UniformBuffer() => Ok(ResourceKind::ConstantBuffer),
        DescriptorType::StorageBuffer(..) => Ok(ResourceKind::StructuredBuffer),
        DescriptorType::Sampler() => Ok(ResourceKind::Sampler),
        DescriptorType::CombinedImageSampler() | DescriptorType::SampledImage() => Ok(ResourceKind::Texture),
        DescriptorType::StorageImage(..) => Ok(ResourceKind::StorageTexture),
        other => Err(Error::InvalidResource(format!(
            "Unsupported SPIR-V descriptor type: {:?}",
            other
        ))),
    }
}

fn stage_from_execution_model(model: ExecutionModel) -> Option<ShaderStage> {
    match model {
        ExecutionModel::Vertex => Some(ShaderStage::Vertex),
        ExecutionModel::TessellationControl => Some(ShaderStage::TessellationControl),
        ExecutionModel::TessellationEvaluation => Some(ShaderStage::TessellationEvaluation),
        ExecutionModel::Geometry => Some(ShaderStage::Geometry),
        ExecutionModel::Fragment => Some(ShaderStage::Fragment),
        _ => None,
    }
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Struct(st) => st.name.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
#[path = "spirv_reflection_tests.rs"]
mod tests;
