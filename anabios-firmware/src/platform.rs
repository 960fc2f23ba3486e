//! Pico W port bundle
//!
//! Binds the RP2040 port implementations to the core's platform trait and
//! provides the two ports that only need embassy: the debounce timer and
//! the delay.

use anabios_core::{Lifecycle, Platform};
use anabios_hal::{OneShotTimer, TimerError};
use anabios_hal_rp2040::{Rp2040BootSelector, Rp2040Radio, Rp2040Restart, Rp2040Retained, Rp2040Store};

use crate::accessory::AccessoryBridge;
use crate::channels::{DebounceCommand, DEBOUNCE_CMD};

/// Raspberry Pi Pico W
pub struct PicoW;

impl Platform for PicoW {
    type Store = Rp2040Store;
    type Retained = Rp2040Retained;
    type Boot = Rp2040BootSelector;
    type Radio = Rp2040Radio;
    type Timer = EmbassyTimer;
    type Delay = embassy_time::Delay;
    type Restart = Rp2040Restart;
}

/// Lifecycle instance owned by the lifecycle task
pub type FirmwareLifecycle = Lifecycle<PicoW, AccessoryBridge>;

/// One-shot timer backed by the debounce task
pub struct EmbassyTimer;

impl OneShotTimer for EmbassyTimer {
    fn arm(&mut self, timeout_ms: u32) -> Result<(), TimerError> {
        DEBOUNCE_CMD.signal(DebounceCommand::Arm(timeout_ms));
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), TimerError> {
        DEBOUNCE_CMD.signal(DebounceCommand::Cancel);
        Ok(())
    }
}
