//! HID Service
//!
//! Owns the HID app registration and routes input to the connected host.
//!
//! All mutable state sits behind one mutex shared with the stack listener.
//! The lock is never held while calling into the stack, since stacks are
//! free to call the listener synchronously from inside those calls.

use crate::domain::connection::{ConnectionState, ConnectionTracker};
use crate::domain::descriptor::{HidAppRecord, SdpSettings, MOUSE_REPORT_ID};
use crate::domain::models::{DeviceHandle, InputEvent, ServiceState, StackEvent};
use crate::domain::report::{
    encode_click, encode_move, encode_scroll, MouseButton, MouseReport,
    DEFAULT_CLICK_RELEASE_DELAY,
};
use crate::domain::settings::Settings;
use crate::error::ServiceError;
use crate::infrastructure::bluetooth::{BluetoothAdapter, HidDeviceProfile, StackListener};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub sdp: SdpSettings,
    /// Wait between the press and release reports of a click.
    pub click_release_delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sdp: SdpSettings::default(),
            click_release_delay: DEFAULT_CLICK_RELEASE_DELAY,
        }
    }
}

impl From<&Settings> for ServiceConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            sdp: settings.sdp.clone(),
            click_release_delay: settings.click_release_delay(),
        }
    }
}

struct Inner {
    state: ServiceState,
    profile: Option<Arc<dyn HidDeviceProfile>>,
    connection: ConnectionTracker,
    /// Bumped by every start and stop; listeners and in-flight starts from an
    /// older epoch are ignored.
    epoch: u64,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    // Every critical section leaves Inner consistent, so a poisoned lock is still usable.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct HidService {
    adapter: Option<Arc<dyn BluetoothAdapter>>,
    record: HidAppRecord,
    click_release_delay: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl HidService {
    pub fn new(adapter: Option<Arc<dyn BluetoothAdapter>>, config: ServiceConfig) -> Self {
        Self {
            adapter,
            record: HidAppRecord::new(config.sdp),
            click_release_delay: config.click_release_delay,
            inner: Arc::new(Mutex::new(Inner {
                state: ServiceState::Stopped,
                profile: None,
                connection: ConnectionTracker::new(),
                epoch: 0,
            })),
        }
    }

    pub fn state(&self) -> ServiceState {
        lock(&self.inner).state
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock(&self.inner).connection.state().clone()
    }

    /// Running with a live profile proxy.
    pub fn is_running(&self) -> bool {
        let inner = lock(&self.inner);
        inner.state == ServiceState::Running && inner.profile.is_some()
    }

    /// Acquire the HID profile and register the mouse app.
    ///
    /// Starting an already starting or running service succeeds without
    /// doing anything. A start issued while a stop is still tearing down
    /// fails, since that teardown would discard the new registration.
    pub fn start(&self) -> Result<(), ServiceError> {
        {
            let inner = lock(&self.inner);
            match inner.state {
                ServiceState::Starting | ServiceState::Running => {
                    debug!("HID service already {:?}", inner.state);
                    return Ok(());
                }
                ServiceState::Stopping => return Err(stopping()),
                ServiceState::Stopped => {}
            }
        }

        let adapter = self
            .adapter
            .as_ref()
            .ok_or(ServiceError::BluetoothUnavailable)?;
        if !adapter.is_enabled() {
            return Err(ServiceError::BluetoothDisabled);
        }

        let epoch = {
            let mut inner = lock(&self.inner);
            match inner.state {
                ServiceState::Starting | ServiceState::Running => return Ok(()),
                ServiceState::Stopping => return Err(stopping()),
                ServiceState::Stopped => {}
            }
            inner.state = ServiceState::Starting;
            inner.epoch += 1;
            inner.epoch
        };
        info!("Starting HID service ({})", self.record.sdp.name);

        let profile = match self.register(adapter.as_ref(), epoch) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("HID service failed to start: {}", e);
                let mut inner = lock(&self.inner);
                if inner.epoch == epoch {
                    inner.state = ServiceState::Stopped;
                    inner.connection.reset();
                }
                return Err(e);
            }
        };

        let mut inner = lock(&self.inner);
        if inner.epoch != epoch {
            // stop() or a lost profile got in first.
            drop(inner);
            profile.unregister_app();
            profile.close();
            return Err(ServiceError::RegistrationFailed(
                "service stopped while starting".to_string(),
            ));
        }
        inner.profile = Some(profile);
        inner.state = ServiceState::Running;
        info!("HID service running");
        Ok(())
    }

    fn register(
        &self,
        adapter: &dyn BluetoothAdapter,
        epoch: u64,
    ) -> Result<Arc<dyn HidDeviceProfile>, ServiceError> {
        let profile = adapter.open_hid_profile()?;
        if let Err(e) = profile.register_app(&self.record, self.listener(epoch)) {
            profile.close();
            return Err(e.into());
        }
        Ok(profile)
    }

    fn listener(&self, epoch: u64) -> StackListener {
        let shared = Arc::downgrade(&self.inner);
        Arc::new(move |event: StackEvent| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut inner = lock(&shared);
            let live = matches!(inner.state, ServiceState::Starting | ServiceState::Running);
            if inner.epoch != epoch || !live {
                debug!("Ignoring stale stack event {:?}", event);
                return;
            }
            match event {
                StackEvent::ProfileLost => {
                    warn!("HID profile proxy lost, service stopped");
                    inner.profile = None;
                    inner.connection.reset();
                    inner.state = ServiceState::Stopped;
                    inner.epoch += 1;
                }
                event => inner.connection.apply(&event),
            }
        })
    }

    /// Drop the host, unregister and release the profile. Never fails.
    pub fn stop(&self) {
        let (epoch, profile, device) = {
            let mut inner = lock(&self.inner);
            if inner.state == ServiceState::Stopped && inner.profile.is_none() {
                debug!("HID service already stopped");
                return;
            }
            inner.state = ServiceState::Stopping;
            inner.epoch += 1;
            (inner.epoch, inner.profile.take(), inner.connection.reset())
        };

        if let Some(profile) = profile {
            if let Some(device) = &device {
                info!("Disconnecting host {}", device);
                profile.disconnect(device);
            }
            profile.unregister_app();
            profile.close();
        }

        let mut inner = lock(&self.inner);
        if inner.epoch == epoch {
            inner.state = ServiceState::Stopped;
        }
        info!("HID service stopped");
    }

    /// Fire-and-forget. Dropped silently unless running with a host attached.
    pub async fn send(&self, event: InputEvent) {
        match event {
            InputEvent::Move { dx, dy } => {
                self.transmit(encode_move(dx, dy));
            }
            InputEvent::Scroll(amount) => {
                self.transmit(encode_scroll(amount));
            }
            InputEvent::Click(button) => self.click(button).await,
        }
    }

    async fn click(&self, button: MouseButton) {
        let [press, release] = encode_click(button);
        let Some(device) = self.transmit(press) else {
            return;
        };

        tokio::time::sleep(self.click_release_delay).await;

        match self.route() {
            Some((profile, current)) if current == device => {
                deliver(profile.as_ref(), &device, release);
            }
            _ => debug!("Skipping release for {}: connection changed", device),
        }
    }

    fn route(&self) -> Option<(Arc<dyn HidDeviceProfile>, DeviceHandle)> {
        let inner = lock(&self.inner);
        if inner.state != ServiceState::Running {
            return None;
        }
        let profile = inner.profile.clone()?;
        let device = inner.connection.state().device()?.clone();
        Some((profile, device))
    }

    /// Returns the host the report went to, if any.
    fn transmit(&self, report: MouseReport) -> Option<DeviceHandle> {
        let Some((profile, device)) = self.route() else {
            trace!("Dropping {:?}: no connected host", report);
            return None;
        };
        deliver(profile.as_ref(), &device, report);
        Some(device)
    }
}

fn stopping() -> ServiceError {
    ServiceError::RegistrationFailed("service is stopping".to_string())
}

fn deliver(profile: &dyn HidDeviceProfile, device: &DeviceHandle, report: MouseReport) {
    let bytes = report.to_bytes();
    trace!("Report to {}: {:02X?}", device, bytes);
    if let Err(e) = profile.send_report(device, MOUSE_REPORT_ID, &bytes) {
        warn!("{}", e);
    }
}
