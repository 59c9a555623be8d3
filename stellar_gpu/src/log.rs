//! Internal logging system for Stellar GPU
//!
//! This module provides a flexible logging system with:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - File and line information for detailed ERROR logs
//!
//! There is no global logger. A cloneable [`Log`] handle is created by the
//! [`Context`](crate::context::Context) and handed to every component that
//! needs to report something; the `engine_*!` macros take that handle as
//! their first argument.

use colored::*;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Implement this trait to create custom loggers (file logging, network logging, etc.)
///
/// # Example
///
/// ```no_run
/// use stellar_gpu::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    ///
    /// # Arguments
    ///
    /// * `entry` - The log entry to process
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level (Trace, Debug, Info, Warn, Error)
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "stellar::Swapchain", "stellar::vulkan")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Very verbose debug information (typically disabled in release)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Warning messages (potential issues)
    Warn,

    /// Error messages (critical issues with file:line details)
    Error,
}

/// Default logger implementation using colored console output
///
/// Colors:
/// - Trace: bright black
/// - Debug: cyan
/// - Info: green
/// - Warn: yellow
/// - Error: red + bold
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        // Format timestamp as YYYY-MM-DD HH:MM:SS.mmm
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp,
                severity_str,
                source,
                entry.message,
                file,
                line
            );
        } else {
            println!(
                "[{}] [{}] [{}] {}",
                timestamp,
                severity_str,
                source,
                entry.message
            );
        }
    }
}

// ===== LOG HANDLE =====

/// Cloneable handle to the active logger
///
/// Entries below `min_severity` are dropped before reaching the logger.
#[derive(Clone)]
pub struct Log {
    logger: Arc<dyn Logger>,
    min_severity: LogSeverity,
}

impl Log {
    /// Wrap a logger
    pub fn new(logger: Arc<dyn Logger>, min_severity: LogSeverity) -> Self {
        Self { logger, min_severity }
    }

    /// Colored console logger
    pub fn console(min_severity: LogSeverity) -> Self {
        Self::new(Arc::new(DefaultLogger), min_severity)
    }

    /// Minimum severity forwarded to the logger
    pub fn min_severity(&self) -> LogSeverity {
        self.min_severity
    }

    /// Returns true if entries of this severity reach the logger
    pub fn enabled(&self, severity: LogSeverity) -> bool {
        severity >= self.min_severity
    }

    /// Log a message (used by the `engine_*!` macros)
    pub fn log(&self, severity: LogSeverity, source: &str, message: String) {
        if !self.enabled(severity) {
            return;
        }
        self.logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Log a message with file:line information
    pub fn log_detailed(
        &self,
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if !self.enabled(severity) {
            return;
        }
        self.logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }
}

impl fmt::Debug for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Log")
            .field("min_severity", &self.min_severity)
            .finish_non_exhaustive()
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, typically disabled)
///
/// # Example
///
/// ```ignore
/// engine_trace!(log, "stellar::Swapchain", "Acquired image {}", index);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log(
            $crate::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! engine_debug {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log(
            $crate::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
///
/// # Example
///
/// ```ignore
/// engine_info!(log, "stellar::Renderer", "Renderer initialized successfully");
/// ```
#[macro_export]
macro_rules! engine_info {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log(
            $crate::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! engine_warn {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log(
            $crate::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR and evaluate to `Error::BackendError` carrying the same message
///
/// # Example
///
/// ```ignore
/// device.reset_fences(&[fence])
///     .map_err(|e| engine_err!(log, "stellar::vulkan", "Failed to reset fence: {:?}", e))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($log:expr, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $log.log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::error::Error::BackendError(message)
    }};
}

/// Log an ERROR and return `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($log, $source, $($arg)*))
    };
}

/// Log an ERROR and evaluate to `Error::Fatal` carrying the same message
#[macro_export]
macro_rules! engine_fatal {
    ($log:expr, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $log.log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::error::Error::Fatal(message)
    }};
}

/// Log an ERROR and evaluate to `Error::PreconditionViolated` carrying the same message
#[macro_export]
macro_rules! engine_violation {
    ($log:expr, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $log.log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::error::Error::PreconditionViolated(message)
    }};
}

/// Check a caller contract, in every build profile
///
/// On failure, logs an ERROR and returns `Err(Error::PreconditionViolated)`
/// from the enclosing function.
///
/// # Example
///
/// ```ignore
/// engine_require!(log, "stellar::DescriptorSetManager",
///     !self.named.contains_key(name), "Descriptor set '{}' already exists", name);
/// ```
#[macro_export]
macro_rules! engine_require {
    ($log:expr, $source:expr, $cond:expr, $($arg:tt)*) => {
        if !($cond) {
            let message = format!($($arg)*);
            $log.log_detailed(
                $crate::log::LogSeverity::Error,
                $source,
                message.clone(),
                file!(),
                line!()
            );
            return Err($crate::error::Error::PreconditionViolated(message));
        }
    };
}

// ===== TEST SUPPORT =====

/// Logger that records entries in memory (tests only)
#[cfg(test)]
pub(crate) mod capture {
    use super::{Log, LogEntry, LogSeverity, Logger};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub(crate) struct CapturingLogger {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl CapturingLogger {
        pub(crate) fn entries(&self) -> Vec<LogEntry> {
            self.entries.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, severity: LogSeverity) -> usize {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.severity == severity)
                .count()
        }

        pub(crate) fn contains(&self, severity: LogSeverity, needle: &str) -> bool {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .any(|e| e.severity == severity && e.message.contains(needle))
        }
    }

    impl Logger for CapturingLogger {
        fn log(&self, entry: &LogEntry) {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }

    /// Log handle forwarding everything to a fresh capturing logger
    pub(crate) fn capture_log() -> (Log, Arc<CapturingLogger>) {
        let logger = Arc::new(CapturingLogger::default());
        (Log::new(logger.clone(), LogSeverity::Trace), logger)
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
