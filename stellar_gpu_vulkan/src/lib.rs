/*!
# Stellar GPU - Vulkan Backend

Vulkan implementation of the `stellar_gpu` [`GraphicsDevice`](stellar_gpu::GraphicsDevice)
trait, built on ash for the API bindings and gpu-allocator for memory.

Also provides SPIR-V reflection (via spirq) producing the
[`ShaderReflection`](stellar_gpu::material::ShaderReflection) that materials
consume.

Validation layer support (debug messenger, colored output, statistics) is
compiled in only with the `vulkan-validation` feature.

# Example

```no_run
use std::sync::Arc;
use stellar_gpu::{Config, Context, Platform, Renderer, WinitPlatform};
use stellar_gpu_vulkan::VulkanGraphicsDevice;

# fn main() -> stellar_gpu::Result<()> {
let ctx = Context::new(Config::default());
let mut platform = WinitPlatform::new("demo", 1280, 720);
platform.initialize()?;

let device = Arc::new(VulkanGraphicsDevice::new(&ctx, &platform)?);
let _renderer = Renderer::new(&ctx, device, &platform)?;
# Ok(())
# }
```
*/

mod vulkan_format;
mod vulkan_context;
mod vulkan_graphics_device;
mod spirv_reflection;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_graphics_device::VulkanGraphicsDevice;
pub use spirv_reflection::{reflect_spirv, reflect_spirv_file};

#[cfg(feature = "vulkan-validation")]
pub use debug::ValidationStats;
