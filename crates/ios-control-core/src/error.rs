//! Error taxonomy for device operations.

use thiserror::Error;

/// Errors surfaced by [`IosDevice`](crate::device::IosDevice) operations.
///
/// Every failure of an external tool ends up in one of these three buckets,
/// so callers only need to distinguish "no such device", "the device or tool
/// misbehaved", and "the tool isn't installed".
#[derive(Error, Debug)]
pub enum ControlError {
    /// No devices are attached, or the requested UDID is not among them.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// An external process failed during a device-bound operation, or the
    /// session is not connected.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The external binary required for the operation is not installed.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl ControlError {
    pub(crate) fn not_connected() -> Self {
        ControlError::Connection("Device not connected".to_string())
    }

    /// The message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            ControlError::DeviceNotFound(msg)
            | ControlError::Connection(msg)
            | ControlError::UnsupportedOperation(msg) => msg,
        }
    }

    /// Returns true for [`ControlError::DeviceNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControlError::DeviceNotFound(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ControlError>;
