//! Lifecycle error type

use anabios_hal::{BootError, TimerError};

use crate::accessory::AccessoryError;
use crate::config::ConfigError;
use crate::network::NetworkError;
use crate::settings::SettingsError;

/// Errors surfaced by the lifecycle orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleError {
    /// Rejected input, nothing was done
    InvalidArgument,
    /// Invalid configuration
    Config(ConfigError),
    /// Persistent settings failure
    Settings(SettingsError),
    /// Boot slot failure
    Boot(BootError),
    /// Network manager failure
    Network(NetworkError),
    /// Debounce timer failure
    Timer(TimerError),
    /// Accessory collaborator failure
    Accessory(AccessoryError),
}

impl From<ConfigError> for LifecycleError {
    fn from(e: ConfigError) -> Self {
        LifecycleError::Config(e)
    }
}

impl From<SettingsError> for LifecycleError {
    fn from(e: SettingsError) -> Self {
        LifecycleError::Settings(e)
    }
}

impl From<BootError> for LifecycleError {
    fn from(e: BootError) -> Self {
        LifecycleError::Boot(e)
    }
}

impl From<NetworkError> for LifecycleError {
    fn from(e: NetworkError) -> Self {
        LifecycleError::Network(e)
    }
}

impl From<TimerError> for LifecycleError {
    fn from(e: TimerError) -> Self {
        LifecycleError::Timer(e)
    }
}

impl From<AccessoryError> for LifecycleError {
    fn from(e: AccessoryError) -> Self {
        LifecycleError::Accessory(e)
    }
}

/// Keeps the first failure of a continue-on-error sequence
#[derive(Debug, Default)]
pub(crate) struct FirstFailure {
    first: Option<LifecycleError>,
}

impl FirstFailure {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Log a failed step and remember it if it is the first
    pub(crate) fn record<T, E>(&mut self, step: &str, result: Result<T, E>) -> Option<T>
    where
        E: Into<LifecycleError>,
    {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let e = e.into();
                warn!("[lifecycle] {} failed: {:?}", step, e);
                self.first.get_or_insert(e);
                None
            }
        }
    }

    pub(crate) fn into_result(self) -> Result<(), LifecycleError> {
        match self.first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
