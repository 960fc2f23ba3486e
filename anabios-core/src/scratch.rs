//! Warm-reboot scratch state
//!
//! The retained block carries the post-reset reason and the fast copy of the
//! restart counter. Two tags are used: [`REASON_TAG`] means both the reason
//! and the counter are valid, [`COUNTER_TAG`] means only the counter is.
//! Anything else is treated as empty (first power-on or corrupted RAM).

use anabios_hal::{RetainedBlock, RetainedMemory};

/// Tag for a block holding a reason and a counter
pub const REASON_TAG: u32 = 0xC0DE_C0DE;

/// Tag for a block holding only a counter (reason already consumed)
pub const COUNTER_TAG: u32 = 0xC0DE_0C0D;

/// Why the previous deliberate reboot was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum PostResetReason {
    /// No deliberate reboot recorded
    None = 0,
    /// Accessory identity (pairings) was reset
    IdentityReset = 1,
    /// Full factory reset
    FactoryReset = 2,
    /// Firmware update requested
    Update = 3,
}

impl PostResetReason {
    /// Decode a raw code; out-of-range values decode to `None`
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => PostResetReason::IdentityReset,
            2 => PostResetReason::FactoryReset,
            3 => PostResetReason::Update,
            _ => PostResetReason::None,
        }
    }

    /// Raw code as stored in retained memory
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Short name used in logs
    pub fn name(self) -> &'static str {
        match self {
            PostResetReason::None => "none",
            PostResetReason::IdentityReset => "identity",
            PostResetReason::FactoryReset => "factory",
            PostResetReason::Update => "update",
        }
    }
}

/// Typed view over the retained block
pub struct ScratchState<R> {
    memory: R,
}

impl<R: RetainedMemory> ScratchState<R> {
    /// Wrap a retained memory block
    pub fn new(memory: R) -> Self {
        Self { memory }
    }

    /// Access the underlying memory
    pub fn memory(&self) -> &R {
        &self.memory
    }

    /// Give the memory back
    pub fn into_memory(self) -> R {
        self.memory
    }

    /// Restart counter, if the block holds one
    pub fn restart_count(&self) -> Option<u32> {
        let block = self.memory.load();
        match block.tag {
            REASON_TAG | COUNTER_TAG => Some(block.restart_count),
            _ => None,
        }
    }

    /// Store the restart counter, keeping a pending reason
    pub fn set_restart_count(&mut self, count: u32) {
        let block = self.memory.load();
        let block = if block.tag == REASON_TAG {
            RetainedBlock {
                restart_count: count,
                ..block
            }
        } else {
            RetainedBlock {
                tag: COUNTER_TAG,
                reason: PostResetReason::None.as_raw(),
                restart_count: count,
            }
        };
        self.memory.store(block);
    }

    /// Pending post-reset reason without consuming it
    pub fn reason(&self) -> PostResetReason {
        let block = self.memory.load();
        if block.tag == REASON_TAG {
            PostResetReason::from_raw(block.reason)
        } else {
            PostResetReason::None
        }
    }

    /// Record the reason for the reboot that is about to happen
    pub fn mark_reason(&mut self, reason: PostResetReason) {
        let restart_count = self.restart_count().unwrap_or(0);
        self.memory.store(RetainedBlock {
            tag: REASON_TAG,
            reason: reason.as_raw(),
            restart_count,
        });
    }

    /// Read the pending reason and clear it
    pub fn take_reason(&mut self) -> PostResetReason {
        let reason = self.reason();
        self.clear_reason();
        reason
    }

    /// Drop the reason tag; a valid counter survives
    pub fn clear_reason(&mut self) {
        let block = match self.restart_count() {
            Some(restart_count) => RetainedBlock {
                tag: COUNTER_TAG,
                reason: PostResetReason::None.as_raw(),
                restart_count,
            },
            None => RetainedBlock::default(),
        };
        self.memory.store(block);
    }
}
