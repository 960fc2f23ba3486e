//! Accessory protocol collaborator
//!
//! The pairing protocol server, its service advertisement and the update
//! trigger characteristic live outside this crate. The lifecycle only needs
//! to stop them, wipe pairings and reset the trigger.

/// Errors reported by the accessory collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccessoryError {
    /// Server or advertiser is not running
    NotRunning,
    /// Advertised service not found
    NotFound,
    /// Operation failed
    Failed,
}

impl AccessoryError {
    /// Whether the error only means there was nothing to stop
    pub fn is_benign(self) -> bool {
        matches!(self, AccessoryError::NotRunning | AccessoryError::NotFound)
    }
}

/// Accessory protocol server
pub trait Accessory {
    /// Ask the server to shut down; in-flight sessions get a grace window
    fn stop(&mut self) -> impl core::future::Future<Output = Result<(), AccessoryError>>;

    /// Withdraw the service discovery advertisement
    fn withdraw_advertisement(&mut self) -> impl core::future::Future<Output = Result<(), AccessoryError>>;

    /// Remove every stored pairing (accessory identity)
    fn reset_pairings(&mut self) -> impl core::future::Future<Output = Result<(), AccessoryError>>;

    /// Report the update trigger back to off
    fn clear_update_trigger(&mut self);
}

/// Optional hook stopping the provisioning server
pub type ShutdownHook = fn();
