/// Mock platform for unit tests (no window)
///
/// Each `poll_events` call consumes the next scripted extent, which lets
/// tests simulate a minimized window being restored.

use std::collections::VecDeque;

use raw_window_handle::{RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle};

use crate::error::Result;
use crate::graphics_device::Extent2D;
use crate::platform::{NativeHandle, Platform};

pub struct MockPlatform {
    pub extent: Extent2D,
    /// Extents applied one per `poll_events` call
    pub scripted_extents: VecDeque<Extent2D>,
    pub polls: usize,
    pub close_requested: bool,
    pub initialized: bool,
}

impl MockPlatform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: Extent2D::new(width, height),
            scripted_extents: VecDeque::new(),
            polls: 0,
            close_requested: false,
            initialized: false,
        }
    }
}

impl Platform for MockPlatform {
    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn poll_events(&mut self) {
        self.polls += 1;
        if let Some(extent) = self.scripted_extents.pop_front() {
            self.extent = extent;
        }
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn native_handle(&self) -> Result<NativeHandle> {
        Ok(NativeHandle {
            display: RawDisplayHandle::Web(WebDisplayHandle::new()),
            window: RawWindowHandle::Web(WebWindowHandle::new(1)),
        })
    }
}
