//! Anabios loader
//!
//! Occupies the start of flash. The boot ROM runs its boot2 stage, which
//! enables XIP and enters this image; the loader then reads the boot
//! record written by the lifecycle's boot selector and jumps into the
//! selected slot image. A missing or invalid record starts the factory
//! image.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt::*;
use {defmt_rtt as _, embassy_rp as _, panic_probe as _};

use anabios_hal::BOOT_RECORD_LEN;
use anabios_hal_rp2040::boot::boot_target;
use anabios_hal_rp2040::flash::{METADATA_OFFSET, XIP_BASE};

#[entry]
fn main() -> ! {
    // SAFETY: the metadata sector is inside the XIP window boot2 mapped
    let record: [u8; BOOT_RECORD_LEN] =
        unsafe { core::ptr::read_volatile((XIP_BASE + METADATA_OFFSET) as *const [u8; BOOT_RECORD_LEN]) };

    let slot = boot_target(&record);
    info!("Starting {} image at {:#x}", slot.label, slot.offset);

    let vector_table = (XIP_BASE + slot.offset) as *const u32;
    // SAFETY: every slot image is linked with its vector table at the slot
    // start (see anabios-firmware/build.rs).
    unsafe {
        let scb = &*cortex_m::peripheral::SCB::PTR;
        scb.vtor.write(vector_table as u32);
        cortex_m::asm::bootload(vector_table)
    }
}
