//! Capabilities the board support code hands to the bootloader.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial;
use embedded_hal::serial::Write as _;
use embedded_storage::nor_flash::NorFlash;

use crate::boot::types::VectorTable;
use crate::config::types::Layout;
use crate::flash::{ExternalFlash, InternalFlash};
use crate::store::{MetadataStore, PagedStorage};
use crate::types::Error;

pub const SEGMENT_CAPACITY: usize = 256;

/// One complete burst of received bytes, as split by the UART idle-line detection.
pub type Segment = heapless::Vec<u8, SEGMENT_CAPACITY>;

/// Command-line UART. The interrupt-fed ring buffer behind it belongs to the board.
pub trait Console: serial::Write<u8> {
    /// Next complete input segment, if any arrived since the last call.
    fn poll_segment(&mut self) -> Option<Segment>;
}

pub trait System {
    /// Does not return on hardware.
    fn reset(&mut self);

    /// Returns every peripheral the bootloader touched to its reset state.
    fn deinit_peripherals(&mut self);

    /// Relocates the vector table and branches into the application.
    ///
    /// # Safety
    ///
    /// Control goes to code the bootloader knows nothing about. `vectors` must
    /// come from [`VectorTable::new`] and interrupts must be quiet.
    unsafe fn start_application(&mut self, vectors: &VectorTable);
}

/// Ties together the concrete peripheral types of one board.
pub trait Board {
    type InternalFlash: NorFlash;
    type ExternalFlash: NorFlash;
    type Eeprom: PagedStorage;
    type Console: Console;
    type Delay: DelayMs<u32>;
    type System: System;
}

/// Raw drivers, as handed over by the board bring-up code.
pub struct Peripherals<B: Board> {
    pub internal_flash: B::InternalFlash,
    pub external_flash: B::ExternalFlash,
    pub eeprom: B::Eeprom,
    pub console: B::Console,
    pub delay: B::Delay,
    pub system: B::System,
}

/// Drivers wrapped into the writers and the metadata store.
pub struct Parts<B: Board> {
    pub internal: InternalFlash<B::InternalFlash>,
    pub external: ExternalFlash<B::ExternalFlash>,
    pub store: MetadataStore<B::Eeprom>,
    pub console: B::Console,
    pub delay: B::Delay,
    pub system: B::System,
}

impl<B: Board> Parts<B> {
    /// Fails when the external flash geometry of `layout` is unusable.
    pub fn new(layout: &Layout, p: Peripherals<B>) -> Result<Self, Error> {
        Ok(Self {
            internal: InternalFlash::new(p.internal_flash, layout.app),
            external: ExternalFlash::new(p.external_flash, layout.slots)?,
            store: MetadataStore::new(p.eeprom),
            console: p.console,
            delay: p.delay,
            system: p.system,
        })
    }

    /// Blocks until the UART accepted `byte`.
    pub fn send(&mut self, byte: u8) -> Result<(), Error> {
        nb::block!(self.console.write(byte)).map_err(|_| Error::Console)
    }
}
