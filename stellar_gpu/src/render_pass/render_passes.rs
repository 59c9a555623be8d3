/// RenderPasses - registry of the named render passes of a renderer
///
/// Passes are built on registration and destroyed together, in reverse
/// registration order, by `cleanup`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::cache::PipelineConfig;
use crate::context::Context;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, RenderPassHandle};
use crate::log::Log;
use crate::render_pass::{RenderpassDescription, MAIN_PASS};
use crate::{engine_info, engine_require, engine_violation};

const SOURCE: &str = "stellar::RenderPasses";

pub struct RenderPasses {
    device: Arc<dyn GraphicsDevice>,
    log: Log,
    passes: Vec<RenderpassDescription>,
    by_name: FxHashMap<String, usize>,
}

impl RenderPasses {
    pub fn new(ctx: &Context, device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            log: ctx.log().clone(),
            passes: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Build (if needed) and register a pass under its name
    pub fn register(&mut self, mut desc: RenderpassDescription) -> Result<RenderPassHandle> {
        engine_require!(self.log, SOURCE, !self.by_name.contains_key(desc.name()),
            "Render pass '{}' is already registered", desc.name());
        if !desc.is_built() {
            desc.build(self.device.as_ref(), &self.log)?;
        }
        let handle = desc.handle();
        engine_info!(self.log, SOURCE, "Registered render pass '{}'", desc.name());
        self.by_name.insert(desc.name().to_string(), self.passes.len());
        self.passes.push(desc);
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<&RenderpassDescription> {
        self.by_name.get(name).map(|&index| &self.passes[index])
    }

    pub fn handle(&self, name: &str) -> Option<RenderPassHandle> {
        self.get(name).map(|pass| pass.handle())
    }

    /// The swapchain pass
    pub fn main(&self) -> Option<&RenderpassDescription> {
        self.get(MAIN_PASS)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Advertise a pipeline shared by materials without a custom shader
    pub fn set_default_pipeline(&mut self, name: &str, config: PipelineConfig) -> Result<()> {
        let index = *self.by_name.get(name).ok_or_else(|| {
            engine_violation!(self.log, SOURCE, "Render pass '{}' is not registered", name)
        })?;
        self.passes[index].set_default_pipeline(config);
        Ok(())
    }

    /// Passes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RenderpassDescription> {
        self.passes.iter()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn cleanup(&mut self) {
        for pass in self.passes.iter_mut().rev() {
            pass.destroy(self.device.as_ref());
        }
        self.passes.clear();
        self.by_name.clear();
    }
}

impl Drop for RenderPasses {
    fn drop(&mut self) {
        self.cleanup();
    }
}
