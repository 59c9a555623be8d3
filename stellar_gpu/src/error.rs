//! Error types for the Stellar GPU core
//!
//! This module defines the error types used throughout the crate: backend
//! failures, unrecoverable GPU failures, caller-contract violations and
//! descriptor pool exhaustion.
//!
//! Stale or suboptimal presentation surfaces are NOT errors: the swapchain
//! handles them internally by recreating itself.

use std::fmt;

/// Result type for Stellar GPU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stellar GPU errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (shader bytecode, image, buffer, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain setup)
    InitializationFailed(String),

    /// Unrecoverable GPU failure (device lost, queue submission failure,
    /// presentation failure other than a stale surface)
    Fatal(String),

    /// Caller broke an API contract (duplicate name, missing entry,
    /// malformed batch, out-of-range reference)
    PreconditionViolated(String),

    /// The descriptor pool has no room left for another set
    PoolExhausted {
        /// Maximum number of sets the pool was created with
        capacity: u32,
    },
}

impl Error {
    /// True when the error must abort the frame loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }

    /// True when the error reports a caller-contract violation
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Error::PreconditionViolated(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Fatal(msg) => write!(f, "Fatal GPU error: {}", msg),
            Error::PreconditionViolated(msg) => write!(f, "Precondition violated: {}", msg),
            Error::PoolExhausted { capacity } => {
                write!(f, "Descriptor pool exhausted (capacity: {} sets)", capacity)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
