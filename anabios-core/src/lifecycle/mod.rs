//! Lifecycle orchestrator
//!
//! Single owner of all lifecycle state: the scratch block, the settings
//! store, boot slot control, the network manager and the restart debounce
//! timer. The firmware feeds it timer expiry, link events and external
//! requests; every deliberate reboot sequence lives in [`sequences`].

mod error;
mod sequences;

pub use error::LifecycleError;

use anabios_hal::{LinkEvent, OneShotTimer};
use embedded_hal_async::delay::DelayNs;
use heapless::String;

use crate::accessory::{Accessory, ShutdownHook};
use crate::boot::BootControl;
use crate::config::{LifecycleConfig, MAX_REVISION_LEN};
use crate::network::{NetworkManager, NetworkState, ReadyCallback};
use crate::platform::{Platform, Ports};
use crate::restart;
use crate::scratch::{PostResetReason, ScratchState};
use crate::settings::Settings;

/// Version used when neither the build nor the caller provides one
const UNKNOWN_VERSION: &str = "0.0.0";

/// What happened during boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootReport {
    /// Restart counter after this boot
    pub restart_count: u32,
    /// Reason recorded by the previous deliberate reboot
    pub reason: PostResetReason,
    /// Whether the crash-loop factory reset ran
    pub factory_reset_triggered: bool,
}

/// Lifecycle orchestrator
pub struct Lifecycle<P: Platform, A> {
    config: LifecycleConfig,
    settings: Settings<P::Store>,
    scratch: ScratchState<P::Retained>,
    boot: BootControl<P::Boot>,
    network: NetworkManager<P::Radio>,
    timer: P::Timer,
    delay: P::Delay,
    restart: P::Restart,
    accessory: A,
    provisioning_shutdown: Option<ShutdownHook>,
    revision: Option<String<MAX_REVISION_LEN>>,
}

impl<P: Platform, A: Accessory> Lifecycle<P, A> {
    /// Create the orchestrator; the configuration is validated first
    pub fn new(config: LifecycleConfig, ports: Ports<P>, accessory: A) -> Result<Self, LifecycleError> {
        config.validate()?;

        Ok(Self {
            boot: BootControl::new(ports.boot, config.updatable_slots),
            config,
            settings: Settings::new(ports.store),
            scratch: ScratchState::new(ports.retained),
            network: NetworkManager::new(ports.radio),
            timer: ports.timer,
            delay: ports.delay,
            restart: ports.restart,
            accessory,
            provisioning_shutdown: None,
            revision: None,
        })
    }

    /// Give the ports back, e.g. to build a fresh instance after a reset
    pub fn release(self) -> (Ports<P>, A) {
        let Self {
            settings,
            scratch,
            boot,
            network,
            timer,
            delay,
            restart,
            accessory,
            ..
        } = self;
        let ports = Ports {
            store: settings.into_store(),
            retained: scratch.into_memory(),
            boot: boot.into_selector(),
            radio: network.into_radio(),
            timer,
            delay,
            restart,
        };
        (ports, accessory)
    }

    /// Active configuration
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Access the accessory collaborator
    pub fn accessory(&self) -> &A {
        &self.accessory
    }

    /// Access the settings store
    pub fn settings(&mut self) -> &mut Settings<P::Store> {
        &mut self.settings
    }

    /// Access the scratch state
    pub fn scratch(&self) -> &ScratchState<P::Retained> {
        &self.scratch
    }

    /// Current network state
    pub fn network_state(&self) -> NetworkState {
        self.network.state()
    }

    /// Initialize the persistent store, erasing it once if it is unusable
    pub async fn init_store(&mut self) -> Result<(), LifecycleError> {
        self.settings.ensure_initialized().await?;
        Ok(())
    }

    /// Run the per-boot restart counter protocol
    ///
    /// Counts this boot, arms the debounce timer, runs the crash-loop
    /// factory reset when the threshold is reached and finally reports and
    /// clears the post-reset reason.
    pub async fn boot(&mut self) -> BootReport {
        let restart_count = restart::record_boot(&mut self.scratch, &mut self.settings).await;
        info!("[lifecycle] restart count {}", restart_count);

        if let Err(e) = self.timer.arm(self.config.restart_debounce_ms) {
            error!("[lifecycle] failed to arm restart debounce timer: {:?}", e);
        }

        if restart::is_crash_loop(restart_count, self.config.crash_loop_threshold) {
            self.crash_loop_countdown(restart_count).await;
            if let Err(e) = restart::reset(&mut self.scratch, &mut self.settings).await {
                warn!("[lifecycle] failed to reset restart counter: {:?}", e);
            }
            if let Err(e) = self.factory_reset_and_reboot().await {
                warn!("[lifecycle] factory reset finished with errors: {:?}", e);
            }

            // Only reached when restart returns; the reason stays pending
            // for the boot that follows.
            return BootReport {
                restart_count: 0,
                reason: PostResetReason::None,
                factory_reset_triggered: true,
            };
        }

        let reason = self.scratch.take_reason();
        info!("[lifecycle] post_reset_flag={}", reason.name());

        BootReport {
            restart_count,
            reason,
            factory_reset_triggered: false,
        }
    }

    async fn crash_loop_countdown(&mut self, restart_count: u32) {
        warn!(
            "[lifecycle] {} consecutive restarts, factory reset in {} s",
            restart_count,
            self.config.countdown_steps
        );
        for remaining in (1..=self.config.countdown_steps).rev() {
            warn!("[lifecycle] factory reset in {}", remaining);
            self.delay.delay_ms(self.config.countdown_step_ms).await;
        }
    }

    /// Debounce timer fired: the last boot was not part of a crash loop
    pub async fn on_restart_debounce_expired(&mut self) -> Result<(), LifecycleError> {
        restart::reset(&mut self.scratch, &mut self.settings).await?;
        Ok(())
    }

    /// Start the station network from stored credentials
    pub async fn start_network(&mut self, on_ready: ReadyCallback) -> Result<(), LifecycleError> {
        self.network.start(&mut self.settings, on_ready).await?;
        Ok(())
    }

    /// Feed a link event to the network manager
    pub async fn handle_link_event(&mut self, event: LinkEvent) {
        self.network.handle_event(event).await;
    }

    /// Stop the station network
    pub async fn stop_network(&mut self) -> Result<(), LifecycleError> {
        self.network.stop().await.map_err(LifecycleError::from)
    }

    /// Register the hook that stops the provisioning server on shutdown
    pub fn register_provisioning_shutdown(&mut self, hook: ShutdownHook) {
        self.provisioning_shutdown = Some(hook);
    }

    /// Resolve and cache the firmware revision
    ///
    /// A stored non-empty `installed_ver` wins; otherwise the running
    /// version (or `fallback` when it is empty) is recorded. Storage
    /// failures are returned but the revision is still cached.
    pub async fn init_firmware_revision(&mut self, running: &str, fallback: &str) -> Result<(), LifecycleError> {
        if fallback.is_empty() {
            return Err(LifecycleError::InvalidArgument);
        }

        let current = if running.is_empty() { fallback } else { running };
        let current = truncated(current);
        self.revision = Some(current.clone());

        self.settings.ensure_initialized().await?;

        let (revision, source, result) = match self.settings.load_installed_version().await {
            Ok(Some(stored)) if !stored.is_empty() => (stored, "stored", Ok(())),
            Ok(_) => {
                let result = self.settings.store_installed_version(current.as_str()).await;
                if let Err(e) = result {
                    warn!("[lifecycle] failed to store firmware revision: {:?}", e);
                }
                (current, "runtime", result.map_err(LifecycleError::from))
            }
            Err(e) => {
                warn!("[lifecycle] reading stored firmware revision failed: {:?}", e);
                (current, "runtime", Ok(()))
            }
        };

        info!("[lifecycle] firmware revision set to {} ({})", revision.as_str(), source);
        self.revision = Some(revision);
        result
    }

    /// Cached firmware revision, or the build version before init
    pub fn firmware_revision(&self) -> &str {
        match &self.revision {
            Some(revision) if !revision.is_empty() => revision.as_str(),
            _ if !self.config.default_firmware_version.is_empty() => self.config.default_firmware_version,
            _ => UNKNOWN_VERSION,
        }
    }

    /// The accessory's update trigger was written
    ///
    /// The trigger always reads back as off; `true` starts the update.
    pub async fn handle_update_trigger(&mut self, requested: bool) -> Result<(), LifecycleError> {
        self.accessory.clear_update_trigger();
        if requested {
            info!("[lifecycle] firmware update requested by accessory");
            self.request_update_and_reboot().await
        } else {
            Ok(())
        }
    }

    async fn pause(&mut self, ms: u32) {
        self.delay.delay_ms(ms).await;
    }
}

fn truncated(version: &str) -> String<MAX_REVISION_LEN> {
    let mut end = version.len().min(MAX_REVISION_LEN);
    while !version.is_char_boundary(end) {
        end -= 1;
    }
    let mut revision = String::new();
    // Cannot fail, `end` fits the capacity
    let _ = revision.push_str(&version[..end]);
    revision
}

#[cfg(test)]
mod tests;
