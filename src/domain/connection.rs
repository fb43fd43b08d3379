//! Connection lifecycle
//!
//! Tracks the single remote host the device is attached to. Purely reactive:
//! it moves only on stack notifications or an explicit reset.

use crate::domain::models::{DeviceHandle, StackEvent};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected(DeviceHandle),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn device(&self) -> Option<&DeviceHandle> {
        match self {
            Self::Connected(device) => Some(device),
            Self::Disconnected => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Apply a device notification. `ProfileLost` is not a device event and
    /// leaves the state alone; the service handles it.
    pub fn apply(&mut self, event: &StackEvent) {
        match event {
            StackEvent::DeviceConnected(device) => {
                match &self.state {
                    ConnectionState::Connected(previous) if previous != device => {
                        info!("Host {} replaces {}", device, previous);
                    }
                    ConnectionState::Connected(_) => {}
                    ConnectionState::Disconnected => info!("Host connected: {}", device),
                }
                self.state = ConnectionState::Connected(device.clone());
            }
            StackEvent::DeviceDisconnected(device) => match &self.state {
                ConnectionState::Connected(current) if current == device => {
                    info!("Host disconnected: {}", device);
                    self.state = ConnectionState::Disconnected;
                }
                ConnectionState::Connected(current) => {
                    debug!("Ignoring disconnect of {} while attached to {}", device, current);
                }
                ConnectionState::Disconnected => {
                    debug!("Disconnect of {} while already disconnected", device);
                }
            },
            StackEvent::ProfileLost => {}
        }
    }

    /// Force back to `Disconnected`, handing back the host that was attached
    /// so the caller can tell the stack to drop it.
    pub fn reset(&mut self) -> Option<DeviceHandle> {
        match std::mem::take(&mut self.state) {
            ConnectionState::Connected(device) => Some(device),
            ConnectionState::Disconnected => None,
        }
    }
}
