/// Descriptor set layout cache
///
/// Keyed by a caller-chosen name. The bindings are only used the first time a
/// name is requested; later requests with the same name return the existing
/// layout even if their bindings differ (a warning is logged in that case).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::error::Result;
use crate::graphics_device::{DescriptorSetLayoutBinding, DescriptorSetLayoutHandle, GraphicsDevice};
use crate::log::Log;
use crate::{engine_debug, engine_violation, engine_warn};

const SOURCE: &str = "stellar::DescriptorSetLayoutCache";

struct SetLayoutEntry {
    handle: DescriptorSetLayoutHandle,
    bindings: Vec<DescriptorSetLayoutBinding>,
}

pub struct DescriptorSetLayoutCache {
    device: Arc<dyn GraphicsDevice>,
    log: Log,
    entries: FxHashMap<String, SetLayoutEntry>,
}

impl DescriptorSetLayoutCache {
    pub fn new(ctx: &Context, device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            log: ctx.log().clone(),
            entries: FxHashMap::default(),
        }
    }

    pub fn get_or_create(
        &mut self,
        name: &str,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        if let Some(entry) = self.entries.get(name) {
            if entry.bindings.as_slice() != bindings {
                engine_warn!(self.log, SOURCE,
                    "Descriptor set layout '{}' requested with different bindings, reusing the first ones",
                    name);
            }
            return Ok(entry.handle);
        }

        let handle = self.device.create_descriptor_set_layout(bindings)?;
        engine_debug!(self.log, SOURCE,
            "Created descriptor set layout '{}' ({} bindings)", name, bindings.len());
        self.entries.insert(
            name.to_string(),
            SetLayoutEntry { handle, bindings: bindings.to_vec() },
        );
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<DescriptorSetLayoutHandle> {
        self.entries.get(name).map(|entry| entry.handle)
    }

    /// Bindings the layout was created with
    pub fn bindings(&self, name: &str) -> Option<&[DescriptorSetLayoutBinding]> {
        self.entries.get(name).map(|entry| entry.bindings.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Destroy one layout
    pub fn destroy(&mut self, name: &str) -> Result<()> {
        let entry = self.entries.remove(name).ok_or_else(|| {
            engine_violation!(self.log, SOURCE, "Descriptor set layout '{}' does not exist", name)
        })?;
        self.device.destroy_descriptor_set_layout(entry.handle);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cleanup(&mut self) {
        for (_, entry) in self.entries.drain() {
            self.device.destroy_descriptor_set_layout(entry.handle);
        }
    }
}

impl Drop for DescriptorSetLayoutCache {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
#[path = "descriptor_set_layout_cache_tests.rs"]
mod tests;
