/// Descriptor set manager
///
/// Owns one fixed-capacity descriptor pool and hands out two kinds of sets:
/// - named sets, kept by the manager and looked up by name (camera, globals)
/// - orphaned sets, returned to the caller who tracks them (per material
///   instance)
///
/// The pool never grows. Every set is released at once by `cleanup`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::config::DescriptorPoolConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::graphics_device::{
    DescriptorPoolHandle, DescriptorResource, DescriptorSetHandle, DescriptorSetLayoutHandle,
    DescriptorUpdate, DescriptorWrite, GraphicsDevice,
};
use crate::log::Log;
use crate::{engine_debug, engine_error, engine_require, engine_violation};

const SOURCE: &str = "stellar::DescriptorSetManager";

pub struct DescriptorSetManager {
    device: Arc<dyn GraphicsDevice>,
    log: Log,
    pool: DescriptorPoolHandle,
    capacity: u32,
    allocated: u32,
    named: FxHashMap<String, DescriptorSetHandle>,
}

impl DescriptorSetManager {
    /// Create the pool sized by `ctx.config().descriptor_pool`
    pub fn new(ctx: &Context, device: Arc<dyn GraphicsDevice>) -> Result<Self> {
        Self::with_config(ctx, device, &ctx.config().descriptor_pool)
    }

    pub fn with_config(
        ctx: &Context,
        device: Arc<dyn GraphicsDevice>,
        config: &DescriptorPoolConfig,
    ) -> Result<Self> {
        let log = ctx.log().clone();
        engine_require!(log, SOURCE, config.max_sets > 0, "Descriptor pool needs at least one set");

        let pool = device.create_descriptor_pool(config.max_sets, &config.pool_sizes)?;
        engine_debug!(log, SOURCE, "Created descriptor pool ({} sets)", config.max_sets);
        Ok(Self {
            device,
            log,
            pool,
            capacity: config.max_sets,
            allocated: 0,
            named: FxHashMap::default(),
        })
    }

    // ===== ALLOCATION =====

    /// Allocate a set the manager keeps under `name`
    pub fn allocate_named(
        &mut self,
        name: &str,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle> {
        engine_require!(self.log, SOURCE, !self.named.contains_key(name),
            "Descriptor set '{}' already exists", name);
        let set = self.allocate(layout)?;
        self.named.insert(name.to_string(), set);
        Ok(set)
    }

    /// Allocate a set owned by the caller
    pub fn allocate_orphan(&mut self, layout: DescriptorSetLayoutHandle) -> Result<DescriptorSetHandle> {
        self.allocate(layout)
    }

    fn allocate(&mut self, layout: DescriptorSetLayoutHandle) -> Result<DescriptorSetHandle> {
        engine_require!(self.log, SOURCE, !self.pool.is_null(),
            "Descriptor pool already destroyed");
        if self.allocated >= self.capacity {
            engine_error!(self.log, SOURCE,
                "Descriptor pool exhausted ({} of {} sets in use)", self.allocated, self.capacity);
            return Err(Error::PoolExhausted { capacity: self.capacity });
        }
        let set = self.device.allocate_descriptor_set(self.pool, layout)?;
        self.allocated += 1;
        Ok(set)
    }

    /// Named set, if allocated
    pub fn get(&self, name: &str) -> Option<DescriptorSetHandle> {
        self.named.get(name).copied()
    }

    fn require_named(&self, name: &str) -> Result<DescriptorSetHandle> {
        self.get(name).ok_or_else(|| {
            engine_violation!(self.log, SOURCE, "Descriptor set '{}' does not exist", name)
        })
    }

    // ===== UPDATES =====

    /// Write one binding of `set`
    pub fn update(&self, set: DescriptorSetHandle, update: DescriptorUpdate) -> Result<()> {
        self.update_batch(set, &[update])
    }

    /// Write several bindings of `set` in one device call
    pub fn update_batch(&self, set: DescriptorSetHandle, updates: &[DescriptorUpdate]) -> Result<()> {
        let writes: Vec<DescriptorWrite> = updates.iter().map(|u| u.to_set(set)).collect();
        self.submit(&writes)
    }

    pub fn update_named(&self, name: &str, update: DescriptorUpdate) -> Result<()> {
        let set = self.require_named(name)?;
        self.update(set, update)
    }

    /// Write `updates[i]` into the set named `names[i]`, in one device call
    ///
    /// The batch is rejected as a whole, before anything reaches the device,
    /// when the lists differ in length or a name is unknown.
    pub fn update_named_batch(&self, names: &[&str], updates: &[DescriptorUpdate]) -> Result<()> {
        engine_require!(self.log, SOURCE, names.len() == updates.len(),
            "Named batch has {} names for {} updates", names.len(), updates.len());

        let mut writes = Vec::with_capacity(updates.len());
        for (name, update) in names.iter().zip(updates) {
            writes.push(update.to_set(self.require_named(name)?));
        }
        self.submit(&writes)
    }

    /// Submit writes that already target concrete sets (may span several sets)
    pub fn write(&self, writes: &[DescriptorWrite]) -> Result<()> {
        self.submit(writes)
    }

    fn submit(&self, writes: &[DescriptorWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        for write in writes {
            self.validate(write)?;
        }
        self.device.update_descriptor_sets(writes);
        Ok(())
    }

    // The resource variant must match the descriptor type
    fn validate(&self, write: &DescriptorWrite) -> Result<()> {
        engine_require!(self.log, SOURCE, !write.set.is_null(),
            "Descriptor write for binding {} targets a null set", write.update.binding);
        let is_buffer = matches!(write.update.resource, DescriptorResource::Buffer(_));
        engine_require!(self.log, SOURCE, is_buffer == write.update.descriptor_type.is_buffer(),
            "Binding {}: {:?} cannot be written from {}",
            write.update.binding,
            write.update.descriptor_type,
            if is_buffer { "a buffer region" } else { "an image" });
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn pool(&self) -> DescriptorPoolHandle {
        self.pool
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn allocated_count(&self) -> u32 {
        self.allocated
    }

    pub fn remaining(&self) -> u32 {
        self.capacity - self.allocated
    }

    pub fn named_count(&self) -> usize {
        self.named.len()
    }

    /// Destroy the pool, releasing every set it handed out
    pub fn cleanup(&mut self) {
        if self.pool.is_null() {
            return;
        }
        self.named.clear();
        self.device.destroy_descriptor_pool(self.pool);
        self.pool = DescriptorPoolHandle::NULL;
        self.allocated = 0;
    }
}

impl Drop for DescriptorSetManager {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
#[path = "descriptor_set_manager_tests.rs"]
mod tests;
