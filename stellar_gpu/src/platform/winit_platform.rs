/// WinitPlatform - Platform implementation on top of winit
///
/// Uses `pump_app_events` so the render loop keeps control of the thread:
/// every `poll_events` call drains pending events and returns immediately.

use std::time::Duration;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::{Error, Result};
use crate::graphics_device::Extent2D;
use crate::platform::{NativeHandle, Platform};

/// Maximum pumps waiting for the window to be created in `initialize`
const MAX_INITIALIZE_PUMPS: usize = 64;

/// Window state driven by winit callbacks
struct WindowState {
    attributes: WindowAttributes,
    window: Option<Window>,
    close_requested: bool,
    extent: Extent2D,
    creation_error: Option<String>,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                let size = window.inner_size();
                self.extent = Extent2D::new(size.width, size.height);
                self.window = Some(window);
            }
            Err(e) => self.creation_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::Resized(size) => {
                self.extent = Extent2D::new(size.width, size.height);
            }
            _ => {}
        }
    }
}

/// Desktop window backed by winit
pub struct WinitPlatform {
    event_loop: Option<EventLoop<()>>,
    state: WindowState,
    /// Allow the event loop on a thread other than main (test harnesses)
    any_thread: bool,
}

impl WinitPlatform {
    /// Describe the window; nothing is created until `initialize`
    pub fn new(title: &str, width: u32, height: u32) -> Self {
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width, height));
        Self::with_attributes(attributes)
    }

    /// Use fully custom window attributes
    pub fn with_attributes(attributes: WindowAttributes) -> Self {
        Self {
            event_loop: None,
            state: WindowState {
                attributes,
                window: None,
                close_requested: false,
                extent: Extent2D::default(),
                creation_error: None,
            },
            any_thread: false,
        }
    }

    /// Allow `initialize` off the main thread (Windows and X11/Wayland)
    pub fn with_any_thread(mut self, any_thread: bool) -> Self {
        self.any_thread = any_thread;
        self
    }

    /// The window, once initialized
    pub fn window(&self) -> Option<&Window> {
        self.state.window.as_ref()
    }

    fn pump(&mut self) {
        let Some(event_loop) = self.event_loop.as_mut() else {
            return;
        };
        if let PumpStatus::Exit(_) = event_loop.pump_app_events(Some(Duration::ZERO), &mut self.state) {
            self.state.close_requested = true;
        }
    }
}

impl Platform for WinitPlatform {
    fn initialize(&mut self) -> Result<()> {
        if self.state.window.is_some() {
            return Ok(());
        }
        let mut builder = EventLoop::builder();
        #[cfg(target_os = "windows")]
        winit::platform::windows::EventLoopBuilderExtWindows::with_any_thread(&mut builder, self.any_thread);
        #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
        winit::platform::x11::EventLoopBuilderExtX11::with_any_thread(&mut builder, self.any_thread);
        let event_loop = builder
            .build()
            .map_err(|e| Error::InitializationFailed(format!("Failed to create event loop: {}", e)))?;
        self.event_loop = Some(event_loop);

        for _ in 0..MAX_INITIALIZE_PUMPS {
            self.pump();
            if let Some(error) = self.state.creation_error.take() {
                return Err(Error::InitializationFailed(format!("Failed to create window: {}", error)));
            }
            if self.state.window.is_some() {
                return Ok(());
            }
        }
        Err(Error::InitializationFailed(
            "Window was not created by the event loop".to_string(),
        ))
    }

    fn poll_events(&mut self) {
        self.pump();
    }

    fn should_close(&self) -> bool {
        self.state.close_requested
    }

    fn extent(&self) -> Extent2D {
        match &self.state.window {
            Some(window) => {
                let size = window.inner_size();
                Extent2D::new(size.width, size.height)
            }
            None => self.state.extent,
        }
    }

    fn native_handle(&self) -> Result<NativeHandle> {
        let window = self
            .state
            .window
            .as_ref()
            .ok_or_else(|| Error::InitializationFailed("Platform not initialized".to_string()))?;
        let display = window
            .display_handle()
            .map_err(|e| Error::InitializationFailed(format!("Failed to get display handle: {}", e)))?;
        let handle = window
            .window_handle()
            .map_err(|e| Error::InitializationFailed(format!("Failed to get window handle: {}", e)))?;
        Ok(NativeHandle {
            display: display.as_raw(),
            window: handle.as_raw(),
        })
    }
}
