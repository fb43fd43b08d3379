//! Bluetooth permission gate
//!
//! Some platforms grant Bluetooth connect/advertise rights at runtime. A
//! request is answered later, so [`PermissionGate::request`] hands back a
//! one-shot receiver that resolves once the platform has decided.

use crate::error::ServiceError;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

pub trait PermissionGate: Send + Sync {
    fn is_granted(&self) -> bool;

    /// Ask for the permissions. Dropping the sender without answering counts as a denial.
    fn request(&self) -> oneshot::Receiver<PermissionDecision>;
}

/// Fixed answer, for platforms without a runtime grant.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions {
    granted: bool,
}

impl StaticPermissions {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

impl PermissionGate for StaticPermissions {
    fn is_granted(&self) -> bool {
        self.granted
    }

    fn request(&self) -> oneshot::Receiver<PermissionDecision> {
        let (tx, rx) = oneshot::channel();
        let decision = if self.granted {
            PermissionDecision::Granted
        } else {
            PermissionDecision::Denied
        };
        let _ = tx.send(decision);
        rx
    }
}

/// Serialises permission requests so at most one is outstanding.
pub struct PermissionBroker {
    gate: Arc<dyn PermissionGate>,
    in_flight: Mutex<()>,
}

impl PermissionBroker {
    pub fn new(gate: Arc<dyn PermissionGate>) -> Self {
        Self {
            gate,
            in_flight: Mutex::new(()),
        }
    }

    /// Resolve once permissions are held, or fail with `PermissionDenied`.
    /// A denial is reported to this caller only; nothing asks again on its own.
    pub async fn ensure_granted(&self) -> Result<(), ServiceError> {
        if self.gate.is_granted() {
            return Ok(());
        }

        let _turn = self.in_flight.lock().await;
        // Whoever held the turn before us may have obtained the grant.
        if self.gate.is_granted() {
            return Ok(());
        }

        info!("Requesting Bluetooth permissions");
        match self.gate.request().await {
            Ok(PermissionDecision::Granted) => {
                info!("Bluetooth permissions granted");
                Ok(())
            }
            Ok(PermissionDecision::Denied) | Err(_) => {
                warn!("Bluetooth permissions denied");
                Err(ServiceError::PermissionDenied)
            }
        }
    }
}
