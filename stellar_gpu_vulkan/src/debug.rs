/// Vulkan Debug Messenger - Handles validation layer messages with colored output
///
/// The messenger state lives in a `DebugState` owned by the device context.
/// Its address is handed to the driver as the callback user data, so there is
/// no process-wide configuration: two devices keep separate statistics.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use std::ffi::{c_void, CStr};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use stellar_gpu::{Config, DebugOutput, DebugSeverity};

/// Validation message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Severity of one validation message, strongest bit wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl MessageLevel {
    pub(crate) fn from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            MessageLevel::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            MessageLevel::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            MessageLevel::Info
        } else {
            MessageLevel::Verbose
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MessageLevel::Error => "ERROR",
            MessageLevel::Warning => "WARNING",
            MessageLevel::Info => "INFO",
            MessageLevel::Verbose => "VERBOSE",
        }
    }

    fn colored_label(&self) -> ColoredString {
        match self {
            MessageLevel::Error => self.label().red().bold(),
            MessageLevel::Warning => self.label().yellow().bold(),
            MessageLevel::Info => self.label().cyan(),
            MessageLevel::Verbose => self.label().bright_black(),
        }
    }
}

/// Severity flags the messenger subscribes to
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Per-device messenger state (callback user data)
pub(crate) struct DebugState {
    severity: DebugSeverity,
    output: DebugOutput,
    panic_on_error: bool,
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
    /// Occurrences of each message text, for repeat markers
    messages: Mutex<FxHashMap<String, u32>>,
}

impl DebugState {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            panic_on_error: config.panic_on_validation_error,
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
            messages: Mutex::new(FxHashMap::default()),
        }
    }

    pub(crate) fn severity(&self) -> DebugSeverity {
        self.severity
    }

    /// True when `level` passes the configured filter
    pub(crate) fn accepts(&self, level: MessageLevel) -> bool {
        match self.severity {
            DebugSeverity::ErrorsOnly => level == MessageLevel::Error,
            DebugSeverity::ErrorsAndWarnings => {
                matches!(level, MessageLevel::Error | MessageLevel::Warning)
            }
            DebugSeverity::All => true,
        }
    }

    /// Count one message and return how many times its text was seen
    pub(crate) fn record(&self, level: MessageLevel, message: &str) -> u32 {
        let counter = match level {
            MessageLevel::Error => &self.errors,
            MessageLevel::Warning => &self.warnings,
            MessageLevel::Info => &self.info,
            MessageLevel::Verbose => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        match self.messages.lock() {
            Ok(mut messages) => {
                let count = messages.entry(message.to_string()).or_insert(0);
                *count += 1;
                *count
            }
            Err(_) => 1,
        }
    }

    pub(crate) fn stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    /// Number of distinct messages that were reported more than once
    pub(crate) fn repeated_messages(&self) -> usize {
        self.messages
            .lock()
            .map(|messages| messages.values().filter(|&&count| count > 1).count())
            .unwrap_or(0)
    }

    /// Print the statistics report to stdout
    pub(crate) fn print_report(&self) {
        let stats = self.stats();

        if stats.total() == 0 {
            println!("\n{}", "✓ No validation messages".green().bold());
            return;
        }

        println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
        if stats.errors > 0 {
            println!("  {} {}", "Errors:".red().bold(), stats.errors);
        }
        if stats.warnings > 0 {
            println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
        }
        if stats.info > 0 {
            println!("  {} {}", "Info:".cyan(), stats.info);
        }
        if stats.verbose > 0 {
            println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
        }
        println!("  {} {}", "Total:".white().bold(), stats.total());

        let repeated = self.repeated_messages();
        if repeated > 0 {
            println!("\n  {} {} message(s) appeared multiple times", "ℹ".cyan(), repeated);
        }
        println!("{}\n", "====================================".bright_blue().bold());
    }

    fn emit(&self, level: MessageLevel, type_str: &str, message_id: &str, message: &str) {
        if !self.accepts(level) {
            return;
        }
        let occurrences = self.record(level, message);
        let repeat = if occurrences > 1 {
            format!(" [×{}]", occurrences)
        } else {
            String::new()
        };

        let console_output = format!(
            "{} {} [{}]{}\n  ├─ {}: {}\n  └─ {}\n",
            "[VULKAN".bright_blue().bold(),
            format!("{}]", level.colored_label()).bright_blue().bold(),
            type_str.bright_black(),
            repeat.yellow(),
            "Message ID".bright_black(),
            message_id.white(),
            message.white()
        );
        let file_output = format!(
            "[VULKAN {}] [{}]{}\n  ├─ Message ID: {}\n  └─ {}\n",
            level.label(), type_str, repeat, message_id, message
        );

        match &self.output {
            DebugOutput::Console => eprint!("{}", console_output),
            DebugOutput::File(path) => write_to_file(path, &file_output),
            DebugOutput::Both(path) => {
                eprint!("{}", console_output);
                write_to_file(path, &file_output);
            }
        }

        // Unwinding out of an extern "system" callback is not allowed
        if self.panic_on_error && level == MessageLevel::Error {
            eprintln!(
                "\n{}\n  Message ID: {}\n  Message: {}\n",
                "VALIDATION ERROR (strict mode), aborting".red().bold(),
                message_id.yellow(),
                message.white()
            );
            std::process::abort();
        }
    }
}

/// Vulkan debug messenger callback
///
/// `user_data` must point at the `DebugState` owned by the device context,
/// which outlives the messenger.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || user_data.is_null() {
        return vk::FALSE;
    }
    let state = &*(user_data as *const DebugState);
    let callback_data = &*p_callback_data;

    let message_id = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    let type_str = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    state.emit(MessageLevel::from_vk(message_severity), type_str, message_id, message);

    vk::FALSE
}

fn write_to_file(path: &str, message: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", message);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
