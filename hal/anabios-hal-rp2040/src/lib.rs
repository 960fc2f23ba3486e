//! RP2040 (Pico W) implementation of the Anabios platform ports
//!
//! Provides the flash-backed settings store and boot selector, the
//! warm-reset retained block, the CYW43 station radio and the software
//! reset.

#![no_std]

pub mod boot;
pub mod flash;
pub mod radio;
pub mod restart;
pub mod retained;
pub mod store;

pub use boot::Rp2040BootSelector;
pub use flash::{shared_flash, SharedFlash};
pub use radio::{LinkEvents, Rp2040Radio};
pub use restart::Rp2040Restart;
pub use retained::Rp2040Retained;
pub use store::Rp2040Store;
