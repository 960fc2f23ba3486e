//! Lifecycle configuration
//!
//! Timing and policy values for the restart-counter protocol and the
//! deliberate-reboot sequences. Firmware builds fill these from build-time
//! values; everything else uses the defaults.

/// Default window after boot in which another boot counts as a crash loop
pub const DEFAULT_RESTART_DEBOUNCE_MS: u32 = 5000;

/// Default number of consecutive restarts that triggers a factory reset
pub const DEFAULT_CRASH_LOOP_THRESHOLD: u32 = 10;

/// Shortest delay allowed between shutdown and reset
pub const MIN_REBOOT_DELAY_MS: u32 = 100;

/// Maximum firmware revision length
pub const MAX_REVISION_LEN: usize = 32;

/// Updatable slot labels, in erase order
pub const DEFAULT_UPDATABLE_SLOTS: &[&str] = &["ota_1", "ota_2", "ota_0"];

const _: () = assert!(DEFAULT_RESTART_DEBOUNCE_MS > 0);
const _: () = assert!(DEFAULT_CRASH_LOOP_THRESHOLD > 0);

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Debounce timeout must be positive
    ZeroDebounce,
    /// Crash-loop threshold must be positive
    ZeroThreshold,
    /// Reboot delay below [`MIN_REBOOT_DELAY_MS`]
    RebootDelayTooShort,
}

/// Lifecycle configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LifecycleConfig {
    /// Time after boot before the restart counter is cleared
    pub restart_debounce_ms: u32,
    /// Restart count at which a factory reset is forced
    pub crash_loop_threshold: u32,
    /// Countdown steps logged before the forced factory reset
    pub countdown_steps: u8,
    /// Delay between countdown steps
    pub countdown_step_ms: u32,
    /// Grace window for in-flight accessory sessions during shutdown
    pub session_grace_ms: u32,
    /// Delay between shutdown and reset, lets logs flush
    pub reboot_delay_ms: u32,
    /// Updatable slot labels erased by a factory reset
    pub updatable_slots: &'static [&'static str],
    /// Version reported when the build carries none
    pub default_firmware_version: &'static str,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            restart_debounce_ms: DEFAULT_RESTART_DEBOUNCE_MS,
            crash_loop_threshold: DEFAULT_CRASH_LOOP_THRESHOLD,
            countdown_steps: 10,
            countdown_step_ms: 1000,
            session_grace_ms: 100,
            reboot_delay_ms: MIN_REBOOT_DELAY_MS,
            updatable_slots: DEFAULT_UPDATABLE_SLOTS,
            default_firmware_version: "0.0.1",
        }
    }
}

impl LifecycleConfig {
    /// Check the configuration for values the protocol cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.restart_debounce_ms == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        if self.crash_loop_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.reboot_delay_ms < MIN_REBOOT_DELAY_MS {
            return Err(ConfigError::RebootDelayTooShort);
        }
        Ok(())
    }
}
