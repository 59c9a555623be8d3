/// Target module - render target attachments and framebuffers

pub mod attachment;
pub mod render_target;

pub use attachment::*;
pub use render_target::*;

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
