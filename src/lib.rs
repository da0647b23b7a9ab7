//! Firmware-update engine for a UART-driven IAP bootloader.
//!
//! At reset [`Bootloader::boot`] decides between the command line, copying a
//! pending image out of external flash, and jumping into the resident
//! application. In command-line mode [`Bootloader::poll`] feeds every input
//! segment to whichever handler the current [`UpdateFlags`] arm.
//!
//! Diagnostics, including every storage and validation failure, go out through
//! `defmt` or `log`. Neither is enabled by default and without one of them the
//! log macros compile to nothing, so a board crate has to turn on the `defmt`
//! or the `log` feature.
#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod boot;
pub mod command;
pub mod config;
pub mod flags;
pub mod flash;
pub mod hal;
pub mod session;
pub mod store;
pub mod types;
pub mod xmodem;

#[cfg(feature = "cortex-m")]
pub mod platform;

#[cfg(test)]
mod testing;

pub use boot::types::{BootOutcome, VectorTable};
pub use boot::Bootloader;
pub use config::types::Layout;
pub use flags::types::UpdateFlags;
pub use hal::{Board, Console, Peripherals, System};
pub use session::{Session, Step};
pub use store::types::SlotMetadata;
pub use types::Error;
