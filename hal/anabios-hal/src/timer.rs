//! One-shot timer abstraction

/// Errors from timer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Timer resources could not be created
    Create,
    /// Timer could not be (re)armed
    Busy,
}

/// Single-shot timer
///
/// Expiry is reported out of band (the platform signals the timer owner);
/// arming an already armed timer restarts it.
pub trait OneShotTimer {
    /// Arm (or re-arm) the timer
    fn arm(&mut self, timeout_ms: u32) -> Result<(), TimerError>;

    /// Disarm the timer; a no-op if it is not armed
    fn cancel(&mut self) -> Result<(), TimerError>;
}
