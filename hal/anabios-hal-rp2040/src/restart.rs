//! Software reset via the Cortex-M SCB

use anabios_hal::Restart;

/// System reset through `AIRCR.SYSRESETREQ`
///
/// RAM is not cleared by this reset, so the retained block survives.
pub struct Rp2040Restart;

impl Restart for Rp2040Restart {
    fn restart(&mut self) {
        cortex_m::peripheral::SCB::sys_reset();
    }
}
