/// Pipeline layout cache
///
/// Keyed by the ordered list of descriptor set layouts plus the ordered
/// push constant ranges. Two requests with the same inputs in the same order
/// share one layout; the same inputs in a different order do not.
///
/// Entries are reference counted: every `get_or_create` takes a reference and
/// `release` gives it back, destroying the layout when the last one goes.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::cache::hash::hash_combine;
use crate::context::Context;
use crate::error::Result;
use crate::graphics_device::{
    DescriptorSetLayoutHandle, GraphicsDevice, PipelineLayoutHandle, PushConstantRange,
};
use crate::log::Log;
use crate::{engine_debug, engine_violation};

const SOURCE: &str = "stellar::PipelineLayoutCache";

/// Structural key of a pipeline layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLayoutKey {
    pub set_layouts: Vec<DescriptorSetLayoutHandle>,
    pub push_constants: Vec<PushConstantRange>,
}

impl PipelineLayoutKey {
    pub fn new(set_layouts: &[DescriptorSetLayoutHandle], push_constants: &[PushConstantRange]) -> Self {
        Self {
            set_layouts: set_layouts.to_vec(),
            push_constants: push_constants.to_vec(),
        }
    }

    /// Combined hash over every layout identity then every push constant range
    pub fn combined_hash(&self) -> u64 {
        let mut seed = 0u64;
        hash_combine(&mut seed, self.set_layouts.len() as u64);
        for layout in &self.set_layouts {
            hash_combine(&mut seed, layout.as_raw());
        }
        hash_combine(&mut seed, self.push_constants.len() as u64);
        for range in &self.push_constants {
            hash_combine(&mut seed, range.offset as u64);
            hash_combine(&mut seed, range.size as u64);
            hash_combine(&mut seed, range.stage_flags.bits() as u64);
        }
        seed
    }
}

impl Hash for PipelineLayoutKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.combined_hash());
    }
}

struct LayoutEntry {
    handle: PipelineLayoutHandle,
    ref_count: u32,
}

pub struct PipelineLayoutCache {
    device: Arc<dyn GraphicsDevice>,
    log: Log,
    entries: FxHashMap<PipelineLayoutKey, LayoutEntry>,
}

impl PipelineLayoutCache {
    pub fn new(ctx: &Context, device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            log: ctx.log().clone(),
            entries: FxHashMap::default(),
        }
    }

    /// Return the layout for these inputs, creating it on first request
    ///
    /// Takes one reference on the entry.
    pub fn get_or_create(
        &mut self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constants: &[PushConstantRange],
    ) -> Result<PipelineLayoutHandle> {
        let key = PipelineLayoutKey::new(set_layouts, push_constants);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.ref_count += 1;
            return Ok(entry.handle);
        }

        let handle = self.device.create_pipeline_layout(set_layouts, push_constants)?;
        engine_debug!(self.log, SOURCE,
            "Created pipeline layout {:?} ({} set layouts, {} push constant ranges)",
            handle, set_layouts.len(), push_constants.len());
        self.entries.insert(key, LayoutEntry { handle, ref_count: 1 });
        Ok(handle)
    }

    /// Layout for these inputs if already cached (no reference taken)
    pub fn get(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constants: &[PushConstantRange],
    ) -> Option<PipelineLayoutHandle> {
        self.entries
            .get(&PipelineLayoutKey::new(set_layouts, push_constants))
            .map(|entry| entry.handle)
    }

    /// Drop one reference; the layout is destroyed with its last reference
    pub fn release(&mut self, handle: PipelineLayoutHandle) -> Result<()> {
        let key = self
            .entries
            .iter()
            .find(|(_, entry)| entry.handle == handle)
            .map(|(key, _)| key.clone());
        let key = key.ok_or_else(|| {
            engine_violation!(self.log, SOURCE, "Pipeline layout {:?} is not in the cache", handle)
        })?;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.ref_count -= 1;
            if entry.ref_count > 0 {
                return Ok(());
            }
        }
        self.entries.remove(&key);
        self.device.destroy_pipeline_layout(handle);
        engine_debug!(self.log, SOURCE, "Destroyed pipeline layout {:?}", handle);
        Ok(())
    }

    /// Outstanding references on a cached layout
    pub fn ref_count(&self, handle: PipelineLayoutHandle) -> u32 {
        self.entries
            .values()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.ref_count)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destroy every cached layout regardless of references
    pub fn cleanup(&mut self) {
        for (_, entry) in self.entries.drain() {
            self.device.destroy_pipeline_layout(entry.handle);
        }
    }
}

impl Drop for PipelineLayoutCache {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
#[path = "pipeline_layout_cache_tests.rs"]
mod tests;
