//! Deliberate reboot sequences
//!
//! Each sequence is a fixed list of steps. A failing step is logged and
//! remembered, the remaining steps still run and the sequence always ends
//! with exactly one call to [`Restart::restart`]. The first failure is
//! returned when the reset does return (host tests only).

use anabios_hal::{Namespace, OneShotTimer, Restart};
use embedded_hal_async::delay::DelayNs;

use super::error::FirstFailure;
use super::{Lifecycle, LifecycleError};
use crate::accessory::{Accessory, AccessoryError};
use crate::platform::Platform;
use crate::restart;
use crate::scratch::PostResetReason;

impl<P: Platform, A: Accessory> Lifecycle<P, A> {
    /// Boot into the factory image so it can install an update
    pub async fn request_update_and_reboot(&mut self) -> Result<(), LifecycleError> {
        info!("[lifecycle] requesting update and reboot");
        let mut failures = FirstFailure::new();

        let flag = self.settings.set_update_requested(true).await;
        failures.record("set update flag", flag);

        let factory_selected = match self.boot.select_factory().await {
            Ok(_) => {
                info!("[lifecycle] set_post_reset_flag=update");
                self.scratch.mark_reason(PostResetReason::Update);
                true
            }
            Err(e) => {
                failures.record("select factory slot", Err::<(), _>(e));
                false
            }
        };

        self.common_shutdown(false, &mut failures).await;

        if factory_selected {
            info!("[lifecycle] rebooting into factory image for update");
        } else {
            info!("[lifecycle] rebooting to continue update workflow");
        }
        self.reboot().await;
        failures.into_result()
    }

    /// Wipe accessory pairings and reboot; network credentials are kept
    pub async fn reset_identity_and_reboot(&mut self) -> Result<(), LifecycleError> {
        info!("[lifecycle] resetting accessory identity and rebooting");
        let mut failures = FirstFailure::new();

        let reselect = self.boot.reselect_running().await;
        failures.record("re-select running slot", reselect);

        info!("[lifecycle] set_post_reset_flag=identity");
        self.scratch.mark_reason(PostResetReason::IdentityReset);

        self.common_shutdown(true, &mut failures).await;

        self.reboot().await;
        failures.into_result()
    }

    /// Erase everything and reboot into the factory image
    pub async fn factory_reset_and_reboot(&mut self) -> Result<(), LifecycleError> {
        info!("[lifecycle] performing factory reset");
        let mut failures = FirstFailure::new();

        let counter = restart::reset(&mut self.scratch, &mut self.settings).await;
        failures.record("reset restart counter", counter);

        // A late expiry would write the counter back while the store is wiped
        let cancel = self.timer.cancel();
        failures.record("cancel restart debounce timer", cancel);

        let factory_selected = match self.boot.select_factory().await {
            Ok(_) => {
                info!("[lifecycle] set_post_reset_flag=factory");
                self.scratch.mark_reason(PostResetReason::FactoryReset);
                true
            }
            Err(e) => {
                failures.record("select factory slot", Err::<(), _>(e));
                false
            }
        };

        info!("[lifecycle] reset_identity_store");
        let pairings = self.accessory.reset_pairings().await;
        failures.record("reset pairings", pairings);

        self.common_shutdown(false, &mut failures).await;

        info!("[lifecycle] erase_credentials");
        let credentials = self.settings.erase_credentials().await;
        failures.record("erase credentials", credentials);

        info!("[lifecycle] clear_firmware_config");
        let firmware = self.settings.clear_namespace(Namespace::Firmware).await;
        failures.record("clear firmware namespace", firmware);

        info!("[lifecycle] clear_lifecycle_state");
        let lifecycle = self.settings.clear_namespace(Namespace::Lifecycle).await;
        failures.record("clear lifecycle namespace", lifecycle);

        info!("[lifecycle] erase_boot_metadata");
        let metadata = self.boot.erase_metadata().await;
        failures.record("erase boot metadata", metadata);

        info!("[lifecycle] erase_updatable_slots");
        let report = self.boot.erase_updatable_slots().await;
        if let Some(e) = report.first_error {
            failures.record("erase updatable slots", Err::<(), _>(e));
        }

        info!("[lifecycle] restore_network_defaults");
        let defaults = self.network.restore_defaults().await;
        failures.record("restore network defaults", defaults);

        info!("[lifecycle] erase_store");
        let wipe = self.settings.wipe().await;
        failures.record("erase store", wipe);

        if factory_selected {
            info!("[lifecycle] factory reset complete, rebooting into factory image");
        } else {
            info!("[lifecycle] factory reset complete, rebooting current image");
        }
        self.reboot().await;
        failures.into_result()
    }

    /// Shutdown shared by every sequence
    async fn common_shutdown(&mut self, reset_identity: bool, failures: &mut FirstFailure) {
        info!("[lifecycle] stop_accessory");
        match self.accessory.stop().await {
            Ok(()) => {}
            Err(e) if e.is_benign() => debug!("[lifecycle] accessory server not running"),
            Err(e) => {
                failures.record("stop accessory", Err::<(), AccessoryError>(e));
            }
        }

        info!("[lifecycle] wait_sessions");
        self.pause(self.config.session_grace_ms).await;

        info!("[lifecycle] stop_advertisement");
        match self.accessory.withdraw_advertisement().await {
            Ok(()) => {}
            Err(e) if e.is_benign() => debug!("[lifecycle] advertisement already gone"),
            Err(e) => {
                failures.record("withdraw advertisement", Err::<(), AccessoryError>(e));
            }
        }

        if reset_identity {
            info!("[lifecycle] reset_identity_store");
            let pairings = self.accessory.reset_pairings().await;
            failures.record("reset pairings", pairings);
        }

        match self.provisioning_shutdown {
            Some(hook) => {
                info!("[lifecycle] stop_provisioning");
                hook();
            }
            None => debug!("[lifecycle] no provisioning shutdown hook registered"),
        }

        info!("[lifecycle] stop_network");
        let network = self.network.stop().await;
        failures.record("stop network", network);
    }

    /// Flush delay followed by the reset
    async fn reboot(&mut self) {
        info!("[lifecycle] delay_before_reset");
        self.delay.delay_ms(self.config.reboot_delay_ms).await;
        info!("[lifecycle] reboot");
        self.restart.restart();
    }
}
