//! Warm-reset retained RAM
//!
//! The block lives in a `.uninit` section so the runtime neither zeroes nor
//! initializes it on reset. After power-on it holds garbage, which the
//! scratch state rejects by its tag.

use core::mem::MaybeUninit;
use core::ptr::{addr_of, addr_of_mut};

use anabios_hal::{RetainedBlock, RetainedMemory};
use portable_atomic::{AtomicBool, Ordering};

#[link_section = ".uninit.anabios"]
static mut RETAINED: MaybeUninit<RetainedBlock> = MaybeUninit::uninit();

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Handle to the retained block; at most one exists
pub struct Rp2040Retained {
    _private: (),
}

impl Rp2040Retained {
    /// Take the retained block handle
    ///
    /// Returns `None` on every call after the first.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self { _private: () })
        }
    }
}

impl RetainedMemory for Rp2040Retained {
    fn load(&self) -> RetainedBlock {
        // SAFETY: every bit pattern is a valid RetainedBlock (three u32s) and
        // the handle is unique, so there is no concurrent writer.
        unsafe { addr_of!(RETAINED).cast::<RetainedBlock>().read_volatile() }
    }

    fn store(&mut self, block: RetainedBlock) {
        // SAFETY: unique handle, see `load`.
        unsafe { addr_of_mut!(RETAINED).cast::<RetainedBlock>().write_volatile(block) }
    }
}
