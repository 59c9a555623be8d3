/// Material - turns shader reflection into descriptor set layouts and one
/// graphics pipeline per render pass
///
/// A material targets a list of render passes by name. For each of them it
/// either adopts the pass's default pipeline or synthesizes its own, keyed
/// `"<material>_<pass>"` in the pipeline cache.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::cache::{
    DescriptorSetLayoutCache, PipelineCache, PipelineConfig, PipelineCreateInfo,
    PipelineLayoutCache,
};
use crate::context::Context;
use crate::error::Result;
use crate::graphics_device::{
    CompareOp, CullMode, DepthStencilState, DescriptorSetLayoutBinding,
    DescriptorSetLayoutHandle, PipelineLayoutHandle, PipelineState, ShaderStageFlags,
};
use crate::log::Log;
use crate::material::{ShaderReflection, ShaderResource, Vertex};
use crate::render_pass::{RenderPasses, RenderpassDescription};
use crate::renderer::Renderer;
use crate::{engine_debug, engine_warn};

const SOURCE: &str = "stellar::Material";

/// Fixed-function settings a material controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialConfig {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub cull_mode: CullMode,
    /// Reuse a pass's default pipeline instead of building a custom one
    pub use_default_pipeline: bool,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_compare: CompareOp::Less,
            cull_mode: CullMode::Back,
            use_default_pipeline: false,
        }
    }
}

/// Pipeline a material uses for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassPipeline {
    /// Shared pipeline advertised by the pass (never destroyed by the material)
    Default {
        config: PipelineConfig,
        layout: PipelineLayoutHandle,
    },
    /// Pipeline synthesized for this material
    Custom {
        config: PipelineConfig,
        layout: PipelineLayoutHandle,
    },
}

impl PassPipeline {
    pub fn config(&self) -> &PipelineConfig {
        match self {
            PassPipeline::Default { config, .. } | PassPipeline::Custom { config, .. } => config,
        }
    }

    pub fn layout(&self) -> PipelineLayoutHandle {
        match self {
            PassPipeline::Default { layout, .. } | PassPipeline::Custom { layout, .. } => *layout,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, PassPipeline::Default { .. })
    }
}

pub struct Material {
    name: String,
    log: Log,
    reflection: ShaderReflection,
    shader_path: Option<PathBuf>,
    passes: Vec<String>,
    config: MaterialConfig,
    /// One layout per distinct set number, ascending; bound by position
    set_layouts: Vec<DescriptorSetLayoutHandle>,
    /// Cache names of `set_layouts`, same order
    set_layout_names: Vec<String>,
    pipelines: FxHashMap<String, PassPipeline>,
}

impl Material {
    pub fn new(ctx: &Context, name: impl Into<String>, reflection: ShaderReflection) -> Self {
        Self {
            name: name.into(),
            log: ctx.log().clone(),
            reflection,
            shader_path: None,
            passes: Vec::new(),
            config: MaterialConfig::default(),
            set_layouts: Vec::new(),
            set_layout_names: Vec::new(),
            pipelines: FxHashMap::default(),
        }
    }

    // ===== BUILDER =====

    pub fn with_shader(mut self, path: impl Into<PathBuf>) -> Self {
        self.shader_path = Some(path.into());
        self
    }

    /// Render into the pass called `pass`
    pub fn with_pass(mut self, pass: impl Into<String>) -> Self {
        let pass = pass.into();
        if !self.passes.contains(&pass) {
            self.passes.push(pass);
        }
        self
    }

    pub fn with_config(mut self, config: MaterialConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_shader_path(&mut self, path: Option<PathBuf>) {
        self.shader_path = path;
    }

    pub fn set_reflection(&mut self, reflection: ShaderReflection) {
        self.reflection = reflection;
    }

    // ===== DESCRIPTOR SET LAYOUTS =====

    /// Build one descriptor set layout per distinct set number
    ///
    /// Resources are stably sorted by (set, binding) and grouped by set; the
    /// resulting layouts are stored in ascending set order and named
    /// `"<material>_set<N>"` in the cache. Layouts this material registered
    /// earlier are rebuilt when their bindings changed and destroyed when
    /// their set is no longer used.
    pub fn create_descriptor_set_layouts(
        &mut self,
        cache: &mut DescriptorSetLayoutCache,
    ) -> Result<&[DescriptorSetLayoutHandle]> {
        let previous = std::mem::take(&mut self.set_layout_names);
        self.set_layouts.clear();

        let mut resources: Vec<&ShaderResource> = self.reflection.resources.iter().collect();
        resources.sort_by_key(|r| (r.set, r.binding));

        for group in resources.chunk_by(|a, b| a.set == b.set) {
            let set = group[0].set;
            let bindings: Vec<DescriptorSetLayoutBinding> = group
                .iter()
                .map(|r| DescriptorSetLayoutBinding {
                    binding: r.binding,
                    descriptor_type: r.kind.descriptor_type(),
                    count: 1,
                    stage_flags: ShaderStageFlags::ALL_GRAPHICS,
                })
                .collect();

            let name = format!("{}_set{}", self.name, set);
            let changed = cache
                .bindings(&name)
                .is_some_and(|existing| existing != bindings.as_slice());
            if changed && previous.contains(&name) {
                engine_debug!(self.log, SOURCE,
                    "Material '{}': bindings of set {} changed, rebuilding its layout",
                    self.name, set);
                cache.destroy(&name)?;
            }

            let handle = cache.get_or_create(&name, &bindings)?;
            self.set_layouts.push(handle);
            self.set_layout_names.push(name);
        }

        for name in previous.iter().filter(|name| !self.set_layout_names.contains(name)) {
            if cache.contains(name) {
                cache.destroy(name)?;
            }
        }

        if self.set_layouts.is_empty() {
            engine_warn!(self.log, SOURCE,
                "Material '{}' has no shader resources, no descriptor set layout created",
                self.name);
        } else {
            engine_debug!(self.log, SOURCE,
                "Material '{}': {} descriptor set layouts from {} resources",
                self.name, self.set_layouts.len(), resources.len());
        }
        Ok(&self.set_layouts)
    }

    // ===== PIPELINES =====

    /// Synthesize (or adopt) a pipeline for every targeted pass
    pub fn reload(&mut self, renderer: &mut Renderer) -> Result<()> {
        let (passes, layout_cache, pipeline_cache) = renderer.material_caches();
        self.reload_with(passes, layout_cache, pipeline_cache)
    }

    /// `reload` against explicit caches
    pub fn reload_with(
        &mut self,
        passes: &RenderPasses,
        layout_cache: &mut PipelineLayoutCache,
        pipeline_cache: &mut PipelineCache,
    ) -> Result<()> {
        for pass_name in self.passes.clone() {
            let Some(pass) = passes.get(&pass_name) else {
                engine_warn!(self.log, SOURCE,
                    "Material '{}' targets unknown render pass '{}', skipped",
                    self.name, pass_name);
                continue;
            };
            self.reload_pass(pass, layout_cache, pipeline_cache)?;
        }
        Ok(())
    }

    fn reload_pass(
        &mut self,
        pass: &RenderpassDescription,
        layout_cache: &mut PipelineLayoutCache,
        pipeline_cache: &mut PipelineCache,
    ) -> Result<()> {
        if self.config.use_default_pipeline {
            let shared = pass
                .default_pipeline()
                .and_then(|config| pipeline_cache.get(config).map(|data| (config, data.layout)));
            if let Some((config, layout)) = shared {
                self.unload_pass(pass.name(), layout_cache, pipeline_cache)?;
                engine_debug!(self.log, SOURCE,
                    "Material '{}' uses default pipeline '{}' for pass '{}'",
                    self.name, config.name, pass.name());
                self.pipelines.insert(
                    pass.name().to_string(),
                    PassPipeline::Default { config: config.clone(), layout },
                );
                return Ok(());
            }
        }

        let Some(shader_path) = self.shader_path.clone() else {
            engine_warn!(self.log, SOURCE,
                "Material '{}' has no shader for pass '{}', no pipeline created",
                self.name, pass.name());
            return Ok(());
        };
        let entry_points = self.reflection.stage_entry_points();
        if entry_points.is_empty() {
            engine_warn!(self.log, SOURCE,
                "Material '{}' shader declares no entry points, no pipeline for pass '{}'",
                self.name, pass.name());
            return Ok(());
        }

        self.unload_pass(pass.name(), layout_cache, pipeline_cache)?;

        let layout = layout_cache.get_or_create(&self.set_layouts, &[])?;
        let mut state = PipelineState::new(layout, pass.handle());
        state.vertex_layout = Vertex::layout();
        state.rasterization.cull_mode = self.config.cull_mode;
        state.depth_stencil = DepthStencilState {
            depth_test_enable: self.config.depth_test,
            depth_write_enable: self.config.depth_write,
            depth_compare_op: self.config.depth_compare,
        };
        if pass.subpasses().first().is_some_and(|s| s.depth_only) {
            state.color_blend_attachments.clear();
        }

        let config = PipelineConfig::new(format!("{}_{}", self.name, pass.name()));
        let created = pipeline_cache.get_or_create(
            &config,
            PipelineCreateInfo {
                shader_path,
                entry_points,
                state,
                descriptor_set_layouts: self.set_layouts.clone(),
            },
        );
        if let Err(e) = created {
            layout_cache.release(layout)?;
            return Err(e);
        }

        self.pipelines
            .insert(pass.name().to_string(), PassPipeline::Custom { config, layout });
        Ok(())
    }

    /// Release every pipeline and layout this material synthesized
    pub fn unload(
        &mut self,
        layout_cache: &mut PipelineLayoutCache,
        pipeline_cache: &mut PipelineCache,
    ) -> Result<()> {
        let passes: Vec<String> = self.pipelines.keys().cloned().collect();
        for pass in passes {
            self.unload_pass(&pass, layout_cache, pipeline_cache)?;
        }
        Ok(())
    }

    fn unload_pass(
        &mut self,
        pass: &str,
        layout_cache: &mut PipelineLayoutCache,
        pipeline_cache: &mut PipelineCache,
    ) -> Result<()> {
        let Some(previous) = self.pipelines.remove(pass) else {
            return Ok(());
        };
        if let PassPipeline::Custom { config, layout } = previous {
            // Caches may already have been cleaned up by a renderer shutdown
            if pipeline_cache.contains(&config) {
                pipeline_cache.destroy_pipeline(&config)?;
            }
            if layout_cache.ref_count(layout) > 0 {
                layout_cache.release(layout)?;
            }
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }

    pub fn shader_path(&self) -> Option<&Path> {
        self.shader_path.as_deref()
    }

    pub fn passes(&self) -> &[String] {
        &self.passes
    }

    pub fn config(&self) -> &MaterialConfig {
        &self.config
    }

    /// Descriptor set layouts in ascending set order
    pub fn descriptor_set_layouts(&self) -> &[DescriptorSetLayoutHandle] {
        &self.set_layouts
    }

    /// Pipeline used for `pass`, if one was created or adopted
    pub fn pipeline(&self, pass: &str) -> Option<&PassPipeline> {
        self.pipelines.get(pass)
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
