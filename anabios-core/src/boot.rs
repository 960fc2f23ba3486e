//! Boot slot maintenance
//!
//! Selection of the next boot image and the destructive slot cleanup run by
//! a factory reset. Cleanup never stops at the first failing slot.

use anabios_hal::{BootError, BootSelector, BootSlot};

/// Outcome of erasing the updatable slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EraseReport {
    /// Labels looked at
    pub attempted: u8,
    /// Slots erased
    pub erased: u8,
    /// Labels with no matching updatable slot
    pub missing: u8,
    /// Slots whose erase failed
    pub failed: u8,
    /// First erase failure
    pub first_error: Option<BootError>,
}

impl EraseReport {
    /// Whether at least one slot was erased
    pub fn any_erased(&self) -> bool {
        self.erased > 0
    }
}

/// Boot target control on top of a [`BootSelector`]
pub struct BootControl<B> {
    selector: B,
    updatable_slots: &'static [&'static str],
}

impl<B: BootSelector> BootControl<B> {
    /// Create a controller erasing `updatable_slots`, in order, on reset
    pub fn new(selector: B, updatable_slots: &'static [&'static str]) -> Self {
        Self {
            selector,
            updatable_slots,
        }
    }

    /// Access the underlying selector
    pub fn selector(&self) -> &B {
        &self.selector
    }

    /// Give the selector back
    pub fn into_selector(self) -> B {
        self.selector
    }

    /// Slot the current image runs from
    pub fn running_slot(&self) -> Option<BootSlot> {
        self.selector.running_slot()
    }

    /// Make the factory slot the next boot target
    pub async fn select_factory(&mut self) -> Result<BootSlot, BootError> {
        let Some(factory) = self.selector.factory_slot() else {
            error!("[lifecycle] factory slot not found, rebooting to current image");
            return Err(BootError::SlotNotFound);
        };

        info!("[lifecycle] set_boot=factory");
        self.selector.set_boot_slot(factory).await.map_err(|e| {
            error!("[lifecycle] failed to select factory slot: {:?}", e);
            e
        })?;
        Ok(factory)
    }

    /// Select the running slot again, overriding any stale selection
    pub async fn reselect_running(&mut self) -> Result<BootSlot, BootError> {
        let Some(running) = self.selector.running_slot() else {
            warn!("[lifecycle] running slot unknown");
            return Err(BootError::SlotNotFound);
        };

        info!("[lifecycle] set_boot=current");
        self.selector.set_boot_slot(running).await.map_err(|e| {
            warn!("[lifecycle] failed to re-select running slot: {:?}", e);
            e
        })?;
        Ok(running)
    }

    /// Erase the boot metadata region
    pub async fn erase_metadata(&mut self) -> Result<(), BootError> {
        self.selector.erase_metadata().await.map_err(|e| {
            error!("[lifecycle] failed to erase boot metadata: {:?}", e);
            e
        })
    }

    /// Erase every configured updatable slot
    ///
    /// Missing labels and failed erases are logged; every label is tried.
    pub async fn erase_updatable_slots(&mut self) -> EraseReport {
        info!("[lifecycle] erasing updatable slots");
        let mut report = EraseReport::default();

        for &label in self.updatable_slots {
            report.attempted += 1;

            let slot = match self.selector.find_slot(label) {
                Some(slot) if !slot.is_factory() => slot,
                Some(_) => {
                    warn!("[lifecycle] slot '{}' is the factory image, skipping", label);
                    report.missing += 1;
                    continue;
                }
                None => {
                    warn!("[lifecycle] slot '{}' not found or already empty", label);
                    report.missing += 1;
                    continue;
                }
            };

            debug!(
                "[lifecycle] erasing slot '{}' at {:#x} (size={})",
                label,
                slot.offset,
                slot.size
            );
            match self.selector.erase_slot(slot).await {
                Ok(()) => report.erased += 1,
                Err(e) => {
                    error!("[lifecycle] failed to erase slot '{}': {:?}", label, e);
                    report.failed += 1;
                    report.first_error.get_or_insert(e);
                }
            }
        }

        if !report.any_erased() {
            warn!("[lifecycle] no updatable slots were erased");
        }
        report
    }
}
