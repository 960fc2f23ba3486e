//! Station-mode network interface abstraction
//!
//! Models the radio and its IP stack as a set of lifecycle calls. Link
//! state changes are not delivered through this trait: the platform turns
//! them into [`LinkEvent`]s that the owner feeds back into the network
//! manager, and only while handlers are registered.

use heapless::String;

/// Maximum SSID length (802.11)
pub const MAX_SSID_LEN: usize = 32;

/// Maximum WPA2 passphrase length
pub const MAX_PASSWORD_LEN: usize = 64;

/// Authentication threshold for the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuthMode {
    /// Open network, no passphrase
    Open,
    /// WPA2 personal (PSK)
    Wpa2Personal,
}

/// Station configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StationConfig {
    /// Network name
    pub ssid: String<MAX_SSID_LEN>,
    /// Passphrase, empty for open networks
    pub password: String<MAX_PASSWORD_LEN>,
    /// Minimum accepted authentication
    pub auth: AuthMode,
}

/// Link-level events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Interface started
    Started,
    /// Association lost or failed
    Disconnected {
        /// Driver-specific reason code
        reason: u16,
    },
    /// IPv4 address acquired
    AddressAcquired {
        /// Address octets
        address: [u8; 4],
    },
}

/// Errors from radio operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Stack was already initialized
    AlreadyInitialized,
    /// Stack not initialized
    NotInitialized,
    /// Radio not started
    NotStarted,
    /// Operation not valid in the current state
    InvalidState,
    /// Out of memory for interface resources
    NoMemory,
    /// Driver reported a failure
    Driver,
}

/// Station radio trait
pub trait StationRadio {
    /// Initialize the interface stack
    ///
    /// May return [`RadioError::AlreadyInitialized`], which callers treat
    /// as success.
    fn init_stack(&mut self) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Start delivering link events
    fn register_handlers(&mut self) -> Result<(), RadioError>;

    /// Stop delivering link events
    fn unregister_handlers(&mut self) -> Result<(), RadioError>;

    /// Apply station configuration (RAM only, not persisted by the radio)
    fn configure(&mut self, config: &StationConfig) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Start the radio
    fn start(&mut self) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Begin association with the configured network
    fn connect(&mut self) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Drop the current association
    fn disconnect(&mut self) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Stop the radio
    fn stop(&mut self) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Tear down the stack and release the interface handle
    fn release(&mut self) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Clear any configuration the radio stack persisted on its own
    fn restore_defaults(&mut self) -> impl core::future::Future<Output = Result<(), RadioError>>;
}
