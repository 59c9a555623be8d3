/// Graphics pipeline cache
///
/// Keyed by [`PipelineConfig`]. On a miss the SPIR-V file is read, wrapped in
/// one shader module shared by every requested stage, the pipeline is built
/// from the caller's fixed-function state, and the module is destroyed again.
///
/// The cache owns pipelines only. Layouts and descriptor set layouts recorded
/// in [`PipelineData`] belong to their own caches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::graphics_device::{
    DescriptorSetLayoutHandle, GraphicsDevice, PipelineHandle, PipelineLayoutHandle,
    PipelineShaderStage, PipelineState, ShaderStage,
};
use crate::log::Log;
use crate::{engine_debug, engine_error, engine_fatal, engine_require, engine_violation};

const SOURCE: &str = "stellar::PipelineCache";

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Identity of a cached pipeline
///
/// Only a name for now; fixed-function toggles can join the key later
/// without touching callers that build it with [`PipelineConfig::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineConfig {
    pub name: String,
}

impl PipelineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for PipelineConfig {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Everything needed to build a pipeline on a cache miss
#[derive(Debug, Clone)]
pub struct PipelineCreateInfo {
    /// Compiled SPIR-V containing every entry point
    pub shader_path: PathBuf,
    /// One stage per (stage, entry point) pair
    pub entry_points: Vec<(ShaderStage, String)>,
    /// Fully populated fixed-function state (layout and render pass included)
    pub state: PipelineState,
    /// Set layouts the pipeline layout was built from
    pub descriptor_set_layouts: Vec<DescriptorSetLayoutHandle>,
}

/// Cached pipeline and what it was built from
#[derive(Debug, Clone)]
pub struct PipelineData {
    pub pipeline: PipelineHandle,
    pub layout: PipelineLayoutHandle,
    pub descriptor_set_layouts: Vec<DescriptorSetLayoutHandle>,
    pub shader_path: PathBuf,
    pub entry_points: Vec<(ShaderStage, String)>,
}

pub struct PipelineCache {
    device: Arc<dyn GraphicsDevice>,
    log: Log,
    entries: FxHashMap<PipelineConfig, PipelineData>,
}

impl PipelineCache {
    pub fn new(ctx: &Context, device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            log: ctx.log().clone(),
            entries: FxHashMap::default(),
        }
    }

    /// Return the pipeline for `config`, building it from `info` on a miss
    pub fn get_or_create(
        &mut self,
        config: &PipelineConfig,
        info: PipelineCreateInfo,
    ) -> Result<PipelineHandle> {
        if let Some(data) = self.entries.get(config) {
            return Ok(data.pipeline);
        }

        engine_require!(self.log, SOURCE, !info.entry_points.is_empty(),
            "Pipeline '{}' has no entry points", config.name);
        engine_require!(self.log, SOURCE, !info.state.layout.is_null(),
            "Pipeline '{}' has no pipeline layout", config.name);
        engine_require!(self.log, SOURCE, !info.state.render_pass.is_null(),
            "Pipeline '{}' has no render pass", config.name);

        let code = read_spirv(&info.shader_path).map_err(|e| {
            engine_error!(self.log, SOURCE, "Pipeline '{}': {}", config.name, e);
            e
        })?;
        let module = self.device.create_shader_module(&code).map_err(|e| {
            engine_fatal!(self.log, SOURCE,
                "Failed to create shader module for '{}': {}", config.name, e)
        })?;

        let stages: Vec<PipelineShaderStage> = info
            .entry_points
            .iter()
            .map(|(stage, entry_point)| PipelineShaderStage {
                stage: *stage,
                module,
                entry_point: entry_point.clone(),
            })
            .collect();

        let result = self.device.create_graphics_pipeline(&stages, &info.state);
        self.device.destroy_shader_module(module);
        let pipeline = result.map_err(|e| {
            engine_fatal!(self.log, SOURCE, "Failed to create pipeline '{}': {}", config.name, e)
        })?;

        engine_debug!(self.log, SOURCE,
            "Created pipeline '{}' from {} ({} stages)",
            config.name, info.shader_path.display(), stages.len());

        self.entries.insert(
            config.clone(),
            PipelineData {
                pipeline,
                layout: info.state.layout,
                descriptor_set_layouts: info.descriptor_set_layouts,
                shader_path: info.shader_path,
                entry_points: info.entry_points,
            },
        );
        Ok(pipeline)
    }

    pub fn get(&self, config: &PipelineConfig) -> Option<&PipelineData> {
        self.entries.get(config)
    }

    pub fn contains(&self, config: &PipelineConfig) -> bool {
        self.entries.contains_key(config)
    }

    /// Destroy one pipeline
    pub fn destroy_pipeline(&mut self, config: &PipelineConfig) -> Result<()> {
        let data = self.entries.remove(config).ok_or_else(|| {
            engine_violation!(self.log, SOURCE, "Pipeline '{}' is not in the cache", config.name)
        })?;
        self.device.destroy_pipeline(data.pipeline);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cleanup(&mut self) {
        for (_, data) in self.entries.drain() {
            self.device.destroy_pipeline(data.pipeline);
        }
    }
}

impl Drop for PipelineCache {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Read a SPIR-V file into 32-bit words
///
/// Rejects files whose size is not a multiple of 4 or that lack the SPIR-V
/// magic number.
pub fn read_spirv(path: &Path) -> Result<Vec<u32>> {
    let bytes = std::fs::read(path).map_err(|e| {
        Error::InvalidResource(format!("Failed to read shader '{}': {}", path.display(), e))
    })?;
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(Error::InvalidResource(format!(
            "Shader '{}' is not SPIR-V ({} bytes, not a whole number of words)",
            path.display(),
            bytes.len()
        )));
    }

    let words: Vec<u32> = bytemuck::pod_collect_to_vec(&bytes);
    if words[0] != SPIRV_MAGIC {
        return Err(Error::InvalidResource(format!(
            "Shader '{}' is not SPIR-V (magic {:#010x})",
            path.display(),
            words[0]
        )));
    }
    Ok(words)
}

#[cfg(test)]
#[path = "pipeline_cache_tests.rs"]
mod tests;
