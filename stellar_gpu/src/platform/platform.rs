/// Platform trait - the windowing capabilities the renderer needs
///
/// The swapchain only needs a framebuffer extent, an event pump (to wait out a
/// minimized window) and a native handle consumed once when the backend
/// creates its presentation surface.

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::error::Result;
use crate::graphics_device::Extent2D;

/// Native display + window handle pair for surface creation
#[derive(Debug, Clone, Copy)]
pub struct NativeHandle {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

pub trait Platform {
    /// Create the window; must be called once before any other method
    fn initialize(&mut self) -> Result<()>;

    /// Process pending window events without blocking
    fn poll_events(&mut self);

    /// True once the user asked to close the window
    fn should_close(&self) -> bool;

    /// Current framebuffer size in pixels (zero while minimized)
    fn extent(&self) -> Extent2D;

    fn native_handle(&self) -> Result<NativeHandle>;
}
