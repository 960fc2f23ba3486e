//! Flash layout and shared flash handle for the Pico W
//!
//! The 2MB flash is split into a loader, a factory image, three updatable
//! images, one boot metadata sector and the settings store at the end.
//! The store and the boot selector share one async flash driver behind a
//! mutex.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

/// Flash configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on the Pico W

/// Start of the XIP window the flash is mapped at
pub const XIP_BASE: u32 = 0x1000_0000;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Loader image
pub const LOADER_OFFSET: u32 = 0x0000_0000;
pub const LOADER_SIZE: u32 = 64 * 1024;

/// Image slots
pub const IMAGE_SIZE: u32 = 384 * 1024;
pub const FACTORY_OFFSET: u32 = LOADER_OFFSET + LOADER_SIZE;
pub const OTA_0_OFFSET: u32 = FACTORY_OFFSET + IMAGE_SIZE;
pub const OTA_1_OFFSET: u32 = OTA_0_OFFSET + IMAGE_SIZE;
pub const OTA_2_OFFSET: u32 = OTA_1_OFFSET + IMAGE_SIZE;

/// Boot metadata sector, just below the store
pub const METADATA_OFFSET: u32 = STORE_START - ERASE_SIZE as u32;

/// Settings store partition (last 64KB)
pub const STORE_SIZE: u32 = 64 * 1024;
pub const STORE_START: u32 = FLASH_SIZE as u32 - STORE_SIZE;

/// Flash range for the settings store
pub const STORE_RANGE: core::ops::Range<u32> = STORE_START..(FLASH_SIZE as u32);

const _: () = assert!(OTA_2_OFFSET + IMAGE_SIZE <= METADATA_OFFSET);

/// RP2040 async flash driver
pub type Rp2040Flash = Flash<'static, FLASH, Async, FLASH_SIZE>;

/// Flash driver shared by the store and the boot selector
pub type SharedFlash = Mutex<CriticalSectionRawMutex, Rp2040Flash>;

/// Create the shared flash driver; the caller places it in static storage
pub fn shared_flash(flash: Peri<'static, FLASH>, dma: Peri<'static, impl Channel>) -> SharedFlash {
    Mutex::new(Flash::new(flash, dma))
}
