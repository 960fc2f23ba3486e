//! Anabios Hardware Abstraction Layer
//!
//! This crate defines the platform ports the lifecycle controller is built
//! on. Chip-specific HALs (RP2040 + CYW43 today) implement them, and the
//! board-agnostic `anabios-core` crate is written purely against them so it
//! can be tested on the host with in-memory fakes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  anabios-firmware (tasks, wiring)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  anabios-core (lifecycle logic)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  anabios-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!           ┌───────────────────┐
//!           │ anabios-hal-rp2040│
//!           └───────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`store::PersistentStore`] - Namespaced, power-loss safe key/value store
//! - [`retained::RetainedMemory`] - RAM block that survives a warm reset
//! - [`boot::BootSelector`] - Firmware image slot selection and erasure
//! - [`radio::StationRadio`] - Station-mode network interface
//! - [`timer::OneShotTimer`] - Single-shot timer
//! - [`restart::Restart`] - Software reset

#![no_std]
#![deny(unsafe_code)]

pub mod boot;
pub mod radio;
pub mod restart;
pub mod retained;
pub mod store;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use boot::{decode_boot_record, encode_boot_record, BootError, BootSelector, BootSlot, SlotKind, BOOT_RECORD_LEN};
pub use radio::{AuthMode, LinkEvent, RadioError, StationConfig, StationRadio};
pub use restart::Restart;
pub use retained::{RetainedBlock, RetainedMemory};
pub use store::{Namespace, PersistentStore, StoreError, StoreKey};
pub use timer::{OneShotTimer, TimerError};
