//! Lifecycle task
//!
//! Owns the orchestrator. Runs the boot protocol, brings the network up
//! and then serves link events, debounce expiry and lifecycle requests.

use defmt::*;
use embassy_futures::select::{select4, Either4};

use anabios_core::{LifecycleError, NetworkError};

use crate::accessory::{provisioning_started, stop_provisioning};
use crate::channels::{
    LifecycleRequest, DEBOUNCE_EXPIRED, LIFECYCLE_REQUESTS, LINK_EVENTS, NETWORK_READY,
};
use crate::platform::FirmwareLifecycle;

/// Version compiled in from lifecycle.toml
const FIRMWARE_VERSION: &str = env!("ANABIOS_FIRMWARE_VERSION");

/// Ready callback: the accessory server may start listening
fn on_network_ready() {
    NETWORK_READY.signal(());
}

#[embassy_executor::task]
pub async fn lifecycle_task(mut lifecycle: FirmwareLifecycle) {
    info!("Lifecycle task started");

    if let Err(e) = lifecycle.init_store().await {
        error!("Settings store unavailable: {:?}", e);
    }

    let report = lifecycle.boot().await;
    info!(
        "Boot #{} (reason: {})",
        report.restart_count,
        report.reason.name()
    );

    let fallback = lifecycle.config().default_firmware_version;
    if let Err(e) = lifecycle.init_firmware_revision(FIRMWARE_VERSION, fallback).await {
        warn!("Firmware revision not recorded: {:?}", e);
    }
    info!("Firmware revision {}", lifecycle.firmware_revision());

    lifecycle.register_provisioning_shutdown(stop_provisioning);

    match lifecycle.start_network(on_network_ready).await {
        Ok(()) => info!("Station network starting"),
        Err(LifecycleError::Network(NetworkError::NotProvisioned)) => {
            info!("No credentials stored, waiting for provisioning");
            provisioning_started();
        }
        Err(e) => error!("Station network failed to start: {:?}", e),
    }

    let link_events = LINK_EVENTS.receiver();
    loop {
        match select4(
            link_events.receive(),
            DEBOUNCE_EXPIRED.wait(),
            LIFECYCLE_REQUESTS.receive(),
            NETWORK_READY.wait(),
        )
        .await
        {
            Either4::First(event) => {
                debug!("Link event: {:?}", event);
                lifecycle.handle_link_event(event).await;
            }
            Either4::Second(()) => {
                if let Err(e) = lifecycle.on_restart_debounce_expired().await {
                    warn!("Restart counter not cleared: {:?}", e);
                }
            }
            Either4::Third(request) => {
                info!("Lifecycle request: {:?}", request);
                let result = match request {
                    LifecycleRequest::Update => lifecycle.request_update_and_reboot().await,
                    LifecycleRequest::IdentityReset => lifecycle.reset_identity_and_reboot().await,
                    LifecycleRequest::FactoryReset => lifecycle.factory_reset_and_reboot().await,
                    LifecycleRequest::UpdateTrigger(requested) => {
                        lifecycle.handle_update_trigger(requested).await
                    }
                };
                if let Err(e) = result {
                    error!("Lifecycle request {:?} failed: {:?}", request, e);
                }
            }
            Either4::Fourth(()) => {
                info!("Network ready");
                lifecycle.accessory().server_started();
            }
        }
    }
}
