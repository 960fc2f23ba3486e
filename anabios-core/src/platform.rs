//! Platform bundle
//!
//! Groups the port implementations of one board so the orchestrator takes a
//! single type parameter instead of seven.

use anabios_hal::{BootSelector, OneShotTimer, PersistentStore, Restart, RetainedMemory, StationRadio};
use embedded_hal_async::delay::DelayNs;

/// Port types of a board
pub trait Platform {
    /// Durable key/value store
    type Store: PersistentStore;
    /// Warm-reboot scratch memory
    type Retained: RetainedMemory;
    /// Boot image selection
    type Boot: BootSelector;
    /// Station radio
    type Radio: StationRadio;
    /// Restart debounce timer
    type Timer: OneShotTimer;
    /// Blocking delays of the reboot sequences
    type Delay: DelayNs;
    /// Software reset
    type Restart: Restart;
}

/// Port instances of a board
pub struct Ports<P: Platform> {
    pub store: P::Store,
    pub retained: P::Retained,
    pub boot: P::Boot,
    pub radio: P::Radio,
    pub timer: P::Timer,
    pub delay: P::Delay,
    pub restart: P::Restart,
}
