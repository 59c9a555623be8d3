/// Cache module - get-or-create caches guaranteeing one GPU object per key
///
/// All caches are plain maps without internal locking and must be driven
/// from the render thread.

pub mod hash;
pub mod pipeline_cache;
pub mod pipeline_layout_cache;
pub mod descriptor_set_layout_cache;
pub mod descriptor_set_manager;

pub use pipeline_cache::{read_spirv, PipelineCache, PipelineConfig, PipelineCreateInfo, PipelineData};
pub use pipeline_layout_cache::{PipelineLayoutCache, PipelineLayoutKey};
pub use descriptor_set_layout_cache::DescriptorSetLayoutCache;
pub use descriptor_set_manager::DescriptorSetManager;
