use crate::domain::report::MouseButton;
use std::fmt;

/// Opaque identifier of a remote host, as the Bluetooth stack reports it
/// (usually its address). Held by value; it owns no connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle(String);

impl DeviceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Logical input accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Move { dx: i32, dy: i32 },
    Click(MouseButton),
    Scroll(i32),
}

/// Notifications delivered by the Bluetooth stack, on whatever thread it likes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    DeviceConnected(DeviceHandle),
    DeviceDisconnected(DeviceHandle),
    /// The HID profile proxy itself went away.
    ProfileLost,
}
