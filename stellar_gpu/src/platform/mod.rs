/// Platform module - windowing capability trait and its winit implementation

pub mod platform;
pub mod winit_platform;

pub use platform::*;
pub use winit_platform::WinitPlatform;

// Mock platform for tests (no window required)
#[cfg(test)]
pub mod mock_platform;
