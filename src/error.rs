//! Error taxonomy for the simulated sensor device
//!
//! Every error here is recoverable from the device's point of view: the caller
//! retries, fixes its arguments, or gives up. The only fatal condition is
//! resource exhaustion at construction time, which surfaces before the device
//! ever comes up.

use thiserror::Error;

/// Errors returned by device operations
#[derive(Debug, Error)]
pub enum SimTempError {
    /// Out-of-bounds configuration or malformed input; state is left unchanged
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Non-blocking read found no data; the caller may retry
    #[error("no sample available")]
    WouldBlock,

    /// A blocking wait was cancelled by device teardown
    #[error("wait interrupted")]
    Interrupted,

    /// The sample was dequeued but could not be delivered to the caller's
    /// buffer. The record is lost, not requeued; the fault code is recorded
    /// in the `last_error` statistic.
    #[error("failed to deliver sample: {0}")]
    TransferFault(#[source] std::io::Error),

    /// Unknown control operation or attribute
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl SimTempError {
    /// errno-style code recorded in the `last_error` statistic and reported
    /// by the `stats` attribute.
    pub fn errno(&self) -> i32 {
        match self {
            SimTempError::InvalidArgument(_) => -22, // EINVAL
            SimTempError::WouldBlock => -11,         // EAGAIN
            SimTempError::Interrupted => -4,         // EINTR
            SimTempError::TransferFault(_) => -14,   // EFAULT
            SimTempError::Unsupported(_) => -25,     // ENOTTY
        }
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, SimTempError>;
