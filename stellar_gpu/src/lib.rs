/*!
# Stellar GPU

Backend-agnostic GPU resource lifecycle and frame orchestration.

Everything here talks to the GPU through the [`GraphicsDevice`] trait; the
Vulkan implementation lives in the `stellar_gpu_vulkan` crate.

## Architecture

- **Swapchain**: presentable image chain and the ring of frames in flight
  (acquire, record, submit, present, recreate on resize)
- **RenderTarget**: framebuffer over owned or borrowed attachments
- **Caches**: pipelines, pipeline layouts, descriptor set layouts and the
  descriptor set manager, each guaranteeing one GPU object per key
- **RenderPasses**: subpass composition and the named pass registry, with
  the "Main" pass always present
- **Material**: descriptor set layouts and per-pass pipelines synthesized
  from shader reflection
- **Renderer**: the context object owning all of the above

Construction goes through an explicit [`Context`] carrying the logger and
the [`Config`]; there are no process-wide singletons.
*/

pub mod error;
pub mod log;
pub mod config;
pub mod context;
pub mod graphics_device;
pub mod platform;
pub mod target;
pub mod swapchain;
pub mod cache;
pub mod render_pass;
pub mod material;
pub mod renderer;

pub use error::{Error, Result};
pub use log::{DefaultLogger, Log, LogEntry, LogSeverity, Logger};
pub use config::{Config, DebugOutput, DebugSeverity, DescriptorPoolConfig};
pub use context::Context;
pub use graphics_device::GraphicsDevice;
pub use platform::{NativeHandle, Platform, WinitPlatform};
pub use renderer::{FrameContext, Renderer};

// Re-export math library at crate root
pub use glam;
