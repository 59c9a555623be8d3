/// Swapchain module - presentable image chain, frame ring and surface selection

pub mod frame;
pub mod surface_selection;
pub mod swapchain;

pub use frame::Frame;
pub use swapchain::Swapchain;

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
