//! Board-agnostic lifecycle logic for the accessory firmware
//!
//! This crate contains everything that does not depend on a specific chip:
//!
//! - Typed settings on top of the persistent store
//! - Warm-reboot scratch state and the post-reset reason
//! - Restart counter / crash-loop protocol
//! - Boot slot selection and cleanup
//! - Station network state machine
//! - Update, identity-reset and factory-reset sequences
//! - Lifecycle configuration

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to every module
mod fmt;

pub mod accessory;
pub mod boot;
pub mod config;
pub mod lifecycle;
pub mod network;
pub mod platform;
pub mod restart;
pub mod scratch;
pub mod settings;

#[cfg(test)]
mod testing;

pub use accessory::{Accessory, AccessoryError, ShutdownHook};
pub use config::LifecycleConfig;
pub use lifecycle::{BootReport, Lifecycle, LifecycleError};
pub use network::{NetworkError, NetworkState, ReadyCallback};
pub use platform::{Platform, Ports};
pub use scratch::PostResetReason;
