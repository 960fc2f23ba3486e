//! Software reset

/// Software reset trait
///
/// On hardware `restart` never returns. Host fakes record the call and
/// return so the caller's sequence can be inspected.
pub trait Restart {
    /// Reset the CPU, keeping retained memory intact
    fn restart(&mut self);
}
