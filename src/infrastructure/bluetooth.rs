//! Bluetooth Module
//!
//! Drives the local adapter's HID-device role.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       HidService                         │
//! │  (start / stop / send, guarded by the connection state)  │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │ BluetoothAdapter / HidDeviceProfile
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌────────────────┐          ┌────────────────┐
//! │ platform stack │          │    Loopback    │
//! │ (not in crate) │          │ - in-process   │
//! │                │          │ - test double  │
//! └────────────────┘          └────────────────┘
//! ```
//!
//! The stack calls back through a [`StackListener`] from any thread.
//!
//! ## Modules
//!
//! - [`service`] - Service controller
//! - [`loopback`] - In-process stack

pub mod loopback;
pub mod service;

use crate::domain::descriptor::HidAppRecord;
use crate::domain::models::{DeviceHandle, StackEvent};
use crate::error::StackError;
use std::sync::Arc;

pub use service::{HidService, ServiceConfig};

/// Connection notifications from the stack.
pub type StackListener = Arc<dyn Fn(StackEvent) + Send + Sync>;

/// The local Bluetooth adapter. A missing adapter is modelled as `None`
/// wherever one is expected.
pub trait BluetoothAdapter: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Acquire the HID-device profile proxy.
    fn open_hid_profile(&self) -> Result<Arc<dyn HidDeviceProfile>, StackError>;
}

/// Profile proxy for the HID-device role.
pub trait HidDeviceProfile: Send + Sync {
    /// Publish the SDP record and descriptor. The listener stays installed
    /// until [`HidDeviceProfile::unregister_app`].
    fn register_app(
        &self,
        record: &HidAppRecord,
        listener: StackListener,
    ) -> Result<(), StackError>;

    fn unregister_app(&self);

    fn send_report(
        &self,
        device: &DeviceHandle,
        report_id: u8,
        data: &[u8],
    ) -> Result<(), StackError>;

    fn disconnect(&self, device: &DeviceHandle);

    /// Release the proxy.
    fn close(&self);
}
