/// Materials: reflection-driven descriptor set layouts and pipelines

pub mod material;
pub mod reflection;
pub mod vertex;

pub use material::{Material, MaterialConfig, PassPipeline};
pub use reflection::{EntryPoint, ResourceKind, ShaderReflection, ShaderResource};
pub use vertex::Vertex;
