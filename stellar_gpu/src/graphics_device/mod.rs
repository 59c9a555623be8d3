/// Graphics device module - backend seam, handles and descriptor types

pub mod graphics_device;
pub mod handles;
pub mod surface;
pub mod image;
pub mod pipeline;
pub mod descriptor;
pub mod render_pass;

pub use graphics_device::*;
pub use handles::*;
pub use surface::*;
pub use image::*;
pub use pipeline::*;
pub use descriptor::*;
pub use render_pass::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
