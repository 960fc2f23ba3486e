//! Inter-task communication channels
//!
//! Static channels and signals connecting the lifecycle task with its
//! helper tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use anabios_hal_rp2040::LinkEvents;

/// Channel capacity for lifecycle requests
const REQUEST_CHANNEL_SIZE: usize = 4;

/// Requests handled by the lifecycle task
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum LifecycleRequest {
    /// Boot into the factory image to install an update
    Update,
    /// Wipe pairings and reboot
    IdentityReset,
    /// Erase everything and reboot
    FactoryReset,
    /// The accessory's update trigger was written
    UpdateTrigger(bool),
}

/// Debounce timer commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DebounceCommand {
    /// Arm (or re-arm) for the given milliseconds
    Arm(u32),
    /// Disarm
    Cancel,
}

/// Link events from the radio and the IP stack
pub static LINK_EVENTS: LinkEvents = LinkEvents::new();

/// Requests from the button and the accessory server
pub static LIFECYCLE_REQUESTS: Channel<CriticalSectionRawMutex, LifecycleRequest, REQUEST_CHANNEL_SIZE> =
    Channel::new();

/// Debounce timer command (updated by the lifecycle task)
pub static DEBOUNCE_CMD: Signal<CriticalSectionRawMutex, DebounceCommand> = Signal::new();

/// Debounce timer expired
pub static DEBOUNCE_EXPIRED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Station network is up; the accessory server may start listening
pub static NETWORK_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();
