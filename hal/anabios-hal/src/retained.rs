//! Retained memory abstraction
//!
//! A small RAM block that keeps its contents across a warm CPU reset but
//! not across a power cycle. After power-on the contents are arbitrary, so
//! readers must validate the tag before trusting anything in it.

/// Raw retained block layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct RetainedBlock {
    /// Validity sentinel
    pub tag: u32,
    /// Raw post-reset reason code
    pub reason: u32,
    /// Consecutive restart counter
    pub restart_count: u32,
}

/// Retained memory trait
pub trait RetainedMemory {
    /// Read the current block contents
    fn load(&self) -> RetainedBlock;

    /// Overwrite the block
    fn store(&mut self, block: RetainedBlock);
}
