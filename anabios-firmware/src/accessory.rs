//! Bridge to the accessory protocol server
//!
//! The pairing server and its advertisement run outside the lifecycle task.
//! This bridge tracks what is running and forwards the lifecycle's
//! shutdown requests.
//!
//! Pairing removal and the update trigger write-back only log for now:
//! they become real calls once the server's pairing store and its trigger
//! characteristic are linked into this image.

use defmt::*;
use portable_atomic::{AtomicBool, Ordering};

use anabios_core::{Accessory, AccessoryError};

/// Set while the server accepts sessions
static SERVER_RUNNING: AtomicBool = AtomicBool::new(false);

/// Set while the service is advertised
static ADVERTISED: AtomicBool = AtomicBool::new(false);

/// Set while the provisioning server runs
static PROVISIONING: AtomicBool = AtomicBool::new(false);

/// Accessory server bridge
pub struct AccessoryBridge;

impl AccessoryBridge {
    /// Network is up: the server starts accepting sessions
    pub fn server_started(&self) {
        SERVER_RUNNING.store(true, Ordering::Release);
        ADVERTISED.store(true, Ordering::Release);
        info!("Accessory server running");
    }
}

impl Accessory for AccessoryBridge {
    async fn stop(&mut self) -> Result<(), AccessoryError> {
        if !SERVER_RUNNING.swap(false, Ordering::AcqRel) {
            return Err(AccessoryError::NotRunning);
        }
        Ok(())
    }

    async fn withdraw_advertisement(&mut self) -> Result<(), AccessoryError> {
        if !ADVERTISED.swap(false, Ordering::AcqRel) {
            return Err(AccessoryError::NotFound);
        }
        Ok(())
    }

    // TODO: remove the stored controller pairings once the server's pairing store is linked in
    async fn reset_pairings(&mut self) -> Result<(), AccessoryError> {
        info!("Removing accessory pairings");
        Ok(())
    }

    fn clear_update_trigger(&mut self) {
        debug!("Update trigger reported back to off");
    }
}

/// Mark the provisioning server as running
pub fn provisioning_started() {
    PROVISIONING.store(true, Ordering::Release);
}

/// Shutdown hook registered with the lifecycle
pub fn stop_provisioning() {
    if PROVISIONING.swap(false, Ordering::AcqRel) {
        info!("Provisioning server stopped");
    }
}
