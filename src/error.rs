//! Error types shared across the crate.

use crate::domain::models::DeviceHandle;
use thiserror::Error;

/// Why `start()` failed. Each one ends that call; nothing retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Bluetooth not available")]
    BluetoothUnavailable,

    #[error("Please enable Bluetooth")]
    BluetoothDisabled,

    #[error("Bluetooth permissions required")]
    PermissionDenied,

    #[error("Failed to start HID: {0}")]
    RegistrationFailed(String),
}

/// Failures reported by a Bluetooth stack backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("HID device profile unavailable: {0}")]
    ProfileUnavailable(String),

    #[error("HID app registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("report to {device} not delivered: {reason}")]
    SendFailed { device: DeviceHandle, reason: String },
}

impl From<StackError> for ServiceError {
    fn from(e: StackError) -> Self {
        ServiceError::RegistrationFailed(e.to_string())
    }
}
