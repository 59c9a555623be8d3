/// Render pass module - subpass composition and the named pass registry

pub mod subpass;
pub mod renderpass_description;
pub mod render_passes;

pub use subpass::Subpass;
pub use renderpass_description::{RenderpassDescription, MAIN_PASS};
pub use render_passes::RenderPasses;

#[cfg(test)]
#[path = "render_pass_tests.rs"]
mod tests;
