//! Loopback Stack
//!
//! An in-process Bluetooth stack. Reports are logged and kept in memory
//! instead of going over the air, and host connections are simulated by
//! calling [`LoopbackProfile::connect_host`] and friends. The daemon uses it
//! when no platform backend is wired in; tests use it as a recording double.

use crate::domain::descriptor::HidAppRecord;
use crate::domain::models::{DeviceHandle, StackEvent};
use crate::domain::report::MouseReport;
use crate::domain::settings::LoopbackSettings;
use crate::error::StackError;
use crate::infrastructure::bluetooth::{BluetoothAdapter, HidDeviceProfile, StackListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

/// One report as handed to the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReport {
    pub device: DeviceHandle,
    pub report_id: u8,
    pub data: Vec<u8>,
    pub sent_at: Instant,
}

#[derive(Default)]
struct ProfileState {
    open: bool,
    record: Option<HidAppRecord>,
    listener: Option<StackListener>,
    registrations: usize,
    connected: Option<DeviceHandle>,
    auto_connect: Option<DeviceHandle>,
    reject_registration: Option<String>,
    open_failure: Option<String>,
    reports: Vec<SentReport>,
    disconnects: Vec<DeviceHandle>,
}

#[derive(Default)]
pub struct LoopbackProfile {
    state: Mutex<ProfileState>,
}

impl LoopbackProfile {
    fn state(&self) -> MutexGuard<'_, ProfileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Call the installed listener, if any, without holding our own lock.
    fn emit(&self, event: StackEvent) {
        let listener = self.state().listener.clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }

    /// Simulate a remote host attaching.
    pub fn connect_host(&self, device: DeviceHandle) {
        self.state().connected = Some(device.clone());
        self.emit(StackEvent::DeviceConnected(device));
    }

    /// Simulate a remote host going away.
    pub fn disconnect_host(&self, device: &DeviceHandle) {
        {
            let mut state = self.state();
            if state.connected.as_ref() == Some(device) {
                state.connected = None;
            }
        }
        self.emit(StackEvent::DeviceDisconnected(device.clone()));
    }

    /// Simulate the platform tearing down the profile proxy.
    pub fn lose_profile(&self) {
        let listener = {
            let mut state = self.state();
            state.open = false;
            state.record = None;
            state.connected = None;
            state.listener.take()
        };
        if let Some(listener) = listener {
            listener(StackEvent::ProfileLost);
        }
    }

    /// Host that attaches as soon as an app registers.
    pub fn auto_connect(&self, device: Option<DeviceHandle>) {
        self.state().auto_connect = device;
    }

    /// Make the next registrations fail with `reason`.
    pub fn reject_registration(&self, reason: Option<String>) {
        self.state().reject_registration = reason;
    }

    /// Make opening the profile proxy fail with `reason`.
    pub fn fail_open(&self, reason: Option<String>) {
        self.state().open_failure = reason;
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    pub fn is_registered(&self) -> bool {
        self.state().record.is_some()
    }

    pub fn registered_record(&self) -> Option<HidAppRecord> {
        self.state().record.clone()
    }

    pub fn registrations(&self) -> usize {
        self.state().registrations
    }

    pub fn listener(&self) -> Option<StackListener> {
        self.state().listener.clone()
    }

    pub fn reports(&self) -> Vec<SentReport> {
        self.state().reports.clone()
    }

    pub fn disconnects(&self) -> Vec<DeviceHandle> {
        self.state().disconnects.clone()
    }
}

impl HidDeviceProfile for LoopbackProfile {
    fn register_app(
        &self,
        record: &HidAppRecord,
        listener: StackListener,
    ) -> Result<(), StackError> {
        let auto_connect = {
            let mut state = self.state();
            if let Some(reason) = &state.reject_registration {
                return Err(StackError::RegistrationRejected(reason.clone()));
            }
            state.record = Some(record.clone());
            state.listener = Some(listener);
            state.registrations += 1;
            state.auto_connect.clone()
        };
        info!(
            "Registered HID app '{}' ({} byte descriptor)",
            record.sdp.name,
            record.descriptor.len()
        );
        if let Some(device) = auto_connect {
            self.connect_host(device);
        }
        Ok(())
    }

    fn unregister_app(&self) {
        let mut state = self.state();
        state.record = None;
        state.listener = None;
        state.connected = None;
    }

    fn send_report(
        &self,
        device: &DeviceHandle,
        report_id: u8,
        data: &[u8],
    ) -> Result<(), StackError> {
        let mut state = self.state();
        if state.record.is_none() {
            return Err(StackError::SendFailed {
                device: device.clone(),
                reason: "no HID app registered".to_string(),
            });
        }
        if state.connected.as_ref() != Some(device) {
            return Err(StackError::SendFailed {
                device: device.clone(),
                reason: "host not connected".to_string(),
            });
        }
        match MouseReport::from_bytes(data) {
            Some(report) => debug!("-> {} {:?}", device, report),
            None => debug!("-> {} {:02X?}", device, data),
        }
        state.reports.push(SentReport {
            device: device.clone(),
            report_id,
            data: data.to_vec(),
            sent_at: Instant::now(),
        });
        Ok(())
    }

    fn disconnect(&self, device: &DeviceHandle) {
        self.state().disconnects.push(device.clone());
        self.disconnect_host(device);
    }

    fn close(&self) {
        let mut state = self.state();
        state.open = false;
        state.record = None;
        state.listener = None;
        state.connected = None;
    }
}

pub struct LoopbackAdapter {
    enabled: AtomicBool,
    profile: Arc<LoopbackProfile>,
}

impl LoopbackAdapter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            profile: Arc::new(LoopbackProfile::default()),
        }
    }

    /// Build the adapter described by settings; `None` when it is configured absent.
    pub fn from_settings(settings: &LoopbackSettings) -> Option<Arc<Self>> {
        if !settings.adapter_present {
            return None;
        }
        let adapter = Self::new(settings.adapter_enabled);
        adapter
            .profile
            .auto_connect(settings.auto_connect_host.clone().map(DeviceHandle::new));
        Some(Arc::new(adapter))
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn profile(&self) -> Arc<LoopbackProfile> {
        self.profile.clone()
    }
}

impl BluetoothAdapter for LoopbackAdapter {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn open_hid_profile(&self) -> Result<Arc<dyn HidDeviceProfile>, StackError> {
        {
            let mut state = self.profile.state();
            if let Some(reason) = &state.open_failure {
                return Err(StackError::ProfileUnavailable(reason.clone()));
            }
            state.open = true;
        }
        Ok(self.profile.clone())
    }
}
