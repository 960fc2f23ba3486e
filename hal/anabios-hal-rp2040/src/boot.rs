//! Boot slot selection on RP2040 flash
//!
//! The `anabios-loader` image at the start of flash reads a single metadata
//! record to pick the image it jumps to. An erased (all `0xFF`) or invalid
//! record means "boot the factory image".

use anabios_hal::{encode_boot_record, decode_boot_record, BootError, BootSelector, BootSlot, SlotKind};
use embedded_storage_async::nor_flash::NorFlash;

use crate::flash::{
    SharedFlash, FACTORY_OFFSET, FLASH_ERASE_SIZE, IMAGE_SIZE, METADATA_OFFSET, OTA_0_OFFSET,
    OTA_1_OFFSET, OTA_2_OFFSET, XIP_BASE,
};

/// Partition table
pub const SLOTS: [BootSlot; 4] = [
    BootSlot {
        label: "factory",
        kind: SlotKind::Factory,
        offset: FACTORY_OFFSET,
        size: IMAGE_SIZE,
    },
    BootSlot {
        label: "ota_0",
        kind: SlotKind::Updatable,
        offset: OTA_0_OFFSET,
        size: IMAGE_SIZE,
    },
    BootSlot {
        label: "ota_1",
        kind: SlotKind::Updatable,
        offset: OTA_1_OFFSET,
        size: IMAGE_SIZE,
    },
    BootSlot {
        label: "ota_2",
        kind: SlotKind::Updatable,
        offset: OTA_2_OFFSET,
        size: IMAGE_SIZE,
    },
];

/// Slot the loader should start for a raw boot record
pub fn boot_target(record: &[u8]) -> BootSlot {
    decode_boot_record(record)
        .and_then(|(offset, size)| SLOTS.iter().copied().find(|s| s.offset == offset && s.size == size))
        .unwrap_or(SLOTS[0]) // factory
}

/// Slot containing a flash offset
fn slot_at(offset: u32) -> Option<BootSlot> {
    SLOTS
        .iter()
        .copied()
        .find(|slot| offset >= slot.offset && offset < slot.offset + slot.size)
}

/// RP2040 boot selector
pub struct Rp2040BootSelector {
    flash: &'static SharedFlash,
    running: Option<BootSlot>,
}

impl Rp2040BootSelector {
    /// Create a boot selector on the shared flash driver
    pub fn new(flash: &'static SharedFlash) -> Self {
        // Any function in this image tells us which slot we run from
        let pc = Self::new as usize as u32;
        let running = pc.checked_sub(XIP_BASE).and_then(slot_at);
        Self { flash, running }
    }
}

impl BootSelector for Rp2040BootSelector {
    fn factory_slot(&self) -> Option<BootSlot> {
        SLOTS.iter().copied().find(BootSlot::is_factory)
    }

    fn running_slot(&self) -> Option<BootSlot> {
        self.running
    }

    fn find_slot(&self, label: &str) -> Option<BootSlot> {
        SLOTS.iter().copied().find(|slot| slot.label == label)
    }

    async fn set_boot_slot(&mut self, slot: BootSlot) -> Result<(), BootError> {
        if slot_at(slot.offset) != Some(slot) {
            return Err(BootError::InvalidSlot);
        }

        let record = encode_boot_record(&slot);
        let mut flash = self.flash.lock().await;
        flash
            .erase(METADATA_OFFSET, METADATA_OFFSET + FLASH_ERASE_SIZE as u32)
            .await
            .map_err(|_| BootError::Flash)?;
        flash
            .write(METADATA_OFFSET, &record)
            .await
            .map_err(|_| BootError::Flash)
    }

    async fn erase_slot(&mut self, slot: BootSlot) -> Result<(), BootError> {
        if slot.is_factory() {
            return Err(BootError::NotUpdatable);
        }
        // Erasing the image we execute from would crash mid-erase
        if self.running == Some(slot) {
            return Err(BootError::InvalidSlot);
        }

        let mut flash = self.flash.lock().await;
        flash
            .erase(slot.offset, slot.offset + slot.size)
            .await
            .map_err(|_| BootError::Flash)
    }

    async fn erase_metadata(&mut self) -> Result<(), BootError> {
        let mut flash = self.flash.lock().await;
        flash
            .erase(METADATA_OFFSET, METADATA_OFFSET + FLASH_ERASE_SIZE as u32)
            .await
            .map_err(|_| BootError::Flash)
    }
}
