//! Boot image slot abstractions
//!
//! The flash holds one factory image and several updatable images. A small
//! metadata region records which slot the loader starts next; it is opaque
//! to callers but can be erased as a whole.

/// Slot kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotKind {
    /// Factory image, never touched by update flows
    Factory,
    /// Updatable image
    Updatable,
}

/// A firmware image slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootSlot {
    /// Slot label ("factory", "ota_0", ...)
    pub label: &'static str,
    /// Slot kind
    pub kind: SlotKind,
    /// Offset from the start of flash
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

impl BootSlot {
    /// Check if this is the factory slot
    pub fn is_factory(&self) -> bool {
        self.kind == SlotKind::Factory
    }
}

/// Errors from boot slot operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    /// No slot with the requested label or kind
    SlotNotFound,
    /// Operation only allowed on updatable slots
    NotUpdatable,
    /// Slot does not hold a bootable image
    InvalidSlot,
    /// Flash operation failed
    Flash,
}

/// Boot selector trait
pub trait BootSelector {
    /// The factory slot, if the partition table has one
    fn factory_slot(&self) -> Option<BootSlot>;

    /// The slot the current image was started from
    fn running_slot(&self) -> Option<BootSlot>;

    /// Look up a slot by label
    fn find_slot(&self, label: &str) -> Option<BootSlot>;

    /// Make `slot` the next boot target
    fn set_boot_slot(&mut self, slot: BootSlot) -> impl core::future::Future<Output = Result<(), BootError>>;

    /// Erase an updatable slot
    ///
    /// Returns [`BootError::NotUpdatable`] for the factory slot.
    fn erase_slot(&mut self, slot: BootSlot) -> impl core::future::Future<Output = Result<(), BootError>>;

    /// Erase the boot metadata region
    fn erase_metadata(&mut self) -> impl core::future::Future<Output = Result<(), BootError>>;
}

/// Boot record magic ("ABOT")
pub const BOOT_RECORD_MAGIC: u32 = 0x544F_4241;

/// Encoded boot record size
pub const BOOT_RECORD_LEN: usize = 16;

/// Encode the boot record naming `slot`
///
/// Layout (little endian): magic, offset, size, inverted offset.
pub fn encode_boot_record(slot: &BootSlot) -> [u8; BOOT_RECORD_LEN] {
    let mut record = [0u8; BOOT_RECORD_LEN];
    record[0..4].copy_from_slice(&BOOT_RECORD_MAGIC.to_le_bytes());
    record[4..8].copy_from_slice(&slot.offset.to_le_bytes());
    record[8..12].copy_from_slice(&slot.size.to_le_bytes());
    record[12..16].copy_from_slice(&(!slot.offset).to_le_bytes());
    record
}

/// Decode a boot record into `(offset, size)`
///
/// Erased flash, a foreign magic or a torn write all decode to `None`.
pub fn decode_boot_record(record: &[u8]) -> Option<(u32, u32)> {
    if record.len() < BOOT_RECORD_LEN {
        return None;
    }
    let word = |i: usize| u32::from_le_bytes([record[i], record[i + 1], record[i + 2], record[i + 3]]);

    if word(0) != BOOT_RECORD_MAGIC || word(12) != !word(4) {
        return None;
    }
    Some((word(4), word(8)))
}
