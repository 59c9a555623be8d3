/// Configuration - application, validation, presentation and pool settings

use crate::graphics_device::{
    ColorSpace, DescriptorPoolSize, DescriptorType, Format, PresentMode, SurfaceFormat,
};
use crate::log::LogSeverity;

/// Validation layer message severity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including info and verbose messages
    All,
}

/// Where validation layer messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Colored stderr output
    Console,
    /// Append to a file (no colors)
    File(String),
    /// Console and file
    Both(String),
}

/// Descriptor pool sizing
///
/// The pool never grows: allocating past `max_sets` fails with
/// `Error::PoolExhausted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPoolConfig {
    /// Maximum number of descriptor sets
    pub max_sets: u32,
    /// Descriptor counts per type
    pub pool_sizes: Vec<DescriptorPoolSize>,
}

impl DescriptorPoolConfig {
    /// Default capacity: 100 sets, 100 uniform-buffer descriptors
    pub const DEFAULT_MAX_SETS: u32 = 100;
    pub const DEFAULT_UNIFORM_BUFFERS: u32 = 100;
}

impl Default for DescriptorPoolConfig {
    fn default() -> Self {
        Self {
            max_sets: Self::DEFAULT_MAX_SETS,
            pool_sizes: vec![DescriptorPoolSize {
                descriptor_type: DescriptorType::UniformBuffer,
                count: Self::DEFAULT_UNIFORM_BUFFERS,
            }],
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name (reported to the driver)
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),

    /// Enable validation layers (only effective when the backend was built
    /// with validation support)
    pub enable_validation: bool,
    /// Validation message filter
    pub debug_severity: DebugSeverity,
    /// Validation message destination
    pub debug_output: DebugOutput,
    /// Panic on the first validation error
    pub panic_on_validation_error: bool,

    /// Preferred swapchain surface format, used when the surface offers it
    pub preferred_surface_format: SurfaceFormat,
    /// Preferred present mode, FIFO is used when unavailable
    pub preferred_present_mode: PresentMode,
    /// Format of the shared depth attachment
    pub depth_format: Format,

    /// Descriptor pool capacity
    pub descriptor_pool: DescriptorPoolConfig,

    /// Log entries below this severity are discarded
    pub min_log_severity: LogSeverity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Stellar Application".to_string(),
            app_version: (1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            panic_on_validation_error: false,
            preferred_surface_format: SurfaceFormat {
                format: Format::B8G8R8A8_SRGB,
                color_space: ColorSpace::SrgbNonlinear,
            },
            preferred_present_mode: PresentMode::Mailbox,
            depth_format: Format::D32_SFLOAT,
            descriptor_pool: DescriptorPoolConfig::default(),
            min_log_severity: if cfg!(debug_assertions) {
                LogSeverity::Debug
            } else {
                LogSeverity::Info
            },
        }
    }
}
