//! CYW43 station radio
//!
//! Wraps the cyw43 control handle. The chip, its runner and the
//! embassy-net stack are created by the firmware (they need the spawner);
//! this adapter only drives association. Link events reach the lifecycle
//! through [`LinkEvents`], which drops them while handlers are
//! unregistered.

use anabios_hal::{AuthMode, LinkEvent, RadioError, StationConfig, StationRadio};
use cyw43::JoinOptions;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use portable_atomic::{AtomicBool, Ordering};

/// Queued link events
pub const LINK_EVENT_DEPTH: usize = 4;

/// Gated link event queue
pub struct LinkEvents {
    channel: Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH>,
    enabled: AtomicBool,
}

impl LinkEvents {
    /// Create a closed queue
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            enabled: AtomicBool::new(false),
        }
    }

    /// Queue an event; dropped while handlers are unregistered or the queue is full
    pub fn publish(&self, event: LinkEvent) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        self.channel.try_send(event).is_ok()
    }

    /// Whether events are currently delivered
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Receiver for the lifecycle task
    pub fn receiver(&self) -> Receiver<'_, CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH> {
        self.channel.receiver()
    }

    fn enable(&self) -> bool {
        !self.enabled.swap(true, Ordering::AcqRel)
    }

    fn disable(&self) -> bool {
        let was_enabled = self.enabled.swap(false, Ordering::AcqRel);
        self.channel.clear();
        was_enabled
    }
}

impl Default for LinkEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// CYW43 station adapter
pub struct Rp2040Radio {
    control: cyw43::Control<'static>,
    clm: &'static [u8],
    events: &'static LinkEvents,
    config: Option<StationConfig>,
    chip_ready: bool,
    initialized: bool,
    started: bool,
}

impl Rp2040Radio {
    /// Create the adapter
    ///
    /// `clm` is the country locale blob loaded on first `init_stack`.
    pub fn new(control: cyw43::Control<'static>, clm: &'static [u8], events: &'static LinkEvents) -> Self {
        Self {
            control,
            clm,
            events,
            config: None,
            chip_ready: false,
            initialized: false,
            started: false,
        }
    }
}

impl StationRadio for Rp2040Radio {
    async fn init_stack(&mut self) -> Result<(), RadioError> {
        if self.initialized {
            return Err(RadioError::AlreadyInitialized);
        }
        // The CLM upload can only happen once per power cycle
        if !self.chip_ready {
            self.control.init(self.clm).await;
            self.control
                .set_power_management(cyw43::PowerManagementMode::PowerSave)
                .await;
            self.chip_ready = true;
        }
        self.initialized = true;
        Ok(())
    }

    fn register_handlers(&mut self) -> Result<(), RadioError> {
        if !self.events.enable() {
            return Err(RadioError::InvalidState);
        }
        Ok(())
    }

    fn unregister_handlers(&mut self) -> Result<(), RadioError> {
        if !self.events.disable() {
            return Err(RadioError::InvalidState);
        }
        Ok(())
    }

    async fn configure(&mut self, config: &StationConfig) -> Result<(), RadioError> {
        if !self.initialized {
            return Err(RadioError::NotInitialized);
        }
        self.config = Some(config.clone());
        Ok(())
    }

    async fn start(&mut self) -> Result<(), RadioError> {
        if !self.initialized {
            return Err(RadioError::NotInitialized);
        }
        if self.config.is_none() {
            return Err(RadioError::InvalidState);
        }
        self.started = true;
        self.events.publish(LinkEvent::Started);
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), RadioError> {
        if !self.started {
            return Err(RadioError::NotStarted);
        }
        let Some(config) = self.config.as_ref() else {
            return Err(RadioError::InvalidState);
        };

        let options = match config.auth {
            AuthMode::Open => JoinOptions::new_open(),
            AuthMode::Wpa2Personal => JoinOptions::new(config.password.as_bytes()),
        };

        // Association failures surface as link events so the owner retries
        if let Err(err) = self.control.join(config.ssid.as_str(), options).await {
            self.events.publish(LinkEvent::Disconnected {
                reason: err.status as u16,
            });
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), RadioError> {
        if !self.started {
            return Err(RadioError::NotStarted);
        }
        self.control.leave().await;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RadioError> {
        if !self.started {
            return Err(RadioError::NotStarted);
        }
        self.control.leave().await;
        self.started = false;
        Ok(())
    }

    async fn release(&mut self) -> Result<(), RadioError> {
        if !self.initialized {
            return Err(RadioError::NotInitialized);
        }
        self.initialized = false;
        self.config = None;
        Ok(())
    }

    async fn restore_defaults(&mut self) -> Result<(), RadioError> {
        // The CYW43 keeps no configuration of its own across resets
        self.config = None;
        Ok(())
    }
}
