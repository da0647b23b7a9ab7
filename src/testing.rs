//! RAM-backed drivers and a fake board for host tests.

use std::collections::VecDeque;
use std::marker::PhantomData;

use embedded_hal::serial;
use embedded_hal_mock::delay::MockNoop;
use embedded_hal_mock::serial::{Mock, Transaction};
use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};
use embedded_storage::ReadStorage;

use crate::boot::types::VectorTable;
use crate::config::STM32F103C8;
use crate::hal::{Board, Console, Parts, Peripherals, Segment, System};
use crate::store::PagedStorage;
use crate::xmodem::types::{CRC_XMODEM, PACKET_SIZE, PAYLOAD_SIZE, SOH};

/// Builds a data packet with a correct CRC.
pub fn packet(number: u8, payload: &[u8; PAYLOAD_SIZE]) -> [u8; PACKET_SIZE] {
    let mut raw = [0u8; PACKET_SIZE];
    raw[0] = SOH;
    raw[1] = number;
    raw[2] = !number;
    raw[3..3 + PAYLOAD_SIZE].copy_from_slice(payload);
    raw[PACKET_SIZE - 2..].copy_from_slice(&CRC_XMODEM.checksum(payload).to_be_bytes());
    raw
}

/// NOR flash in a Vec. Programming ANDs bits in, erasing sets them back to 1.
pub struct MemFlash {
    pub mem: Vec<u8>,
    pub erases: Vec<(u32, u32)>,
    pub writes: Vec<(u32, usize)>,
    /// Byte that reads 0x00 after every erase.
    pub stuck: Option<u32>,
    pub fail_writes: bool,
    pub fail_erases: bool,
}

impl MemFlash {
    pub fn new(capacity: usize) -> Self {
        Self {
            mem: vec![0xFF; capacity],
            erases: Vec::new(),
            writes: Vec::new(),
            stuck: None,
            fail_writes: false,
            fail_erases: false,
        }
    }

    /// 64K of MCU flash, offsets counted from 0x0800_0000.
    pub fn internal() -> Self {
        Self::new(64 * 1024)
    }

    /// Ten 1M slots.
    pub fn external() -> Self {
        Self::new(10 * 1024 * 1024)
    }

    /// Programs bytes the way the OTA agent or a debugger would.
    pub fn preload(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        self.mem[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn check(&self, offset: u32, len: usize, align: usize) -> Result<(), NorFlashErrorKind> {
        if offset as usize % align != 0 || len % align != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if offset as usize + len > self.mem.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        Ok(())
    }
}

impl ErrorType for MemFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MemFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.check(offset, bytes.len(), Self::READ_SIZE)?;
        let start = offset as usize;
        bytes.copy_from_slice(&self.mem[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.mem.len()
    }
}

impl NorFlash for MemFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 256;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if to < from {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        self.check(from, (to - from) as usize, Self::ERASE_SIZE)?;
        if self.fail_erases {
            return Err(NorFlashErrorKind::Other);
        }

        self.mem[from as usize..to as usize].fill(0xFF);
        if let Some(stuck) = self.stuck {
            if (from..to).contains(&stuck) {
                self.mem[stuck as usize] = 0x00;
            }
        }
        self.erases.push((from, to));
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check(offset, bytes.len(), Self::WRITE_SIZE)?;
        if self.fail_writes {
            return Err(NorFlashErrorKind::Other);
        }

        let start = offset as usize;
        for (cell, byte) in self.mem[start..start + bytes.len()].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        self.writes.push((offset, bytes.len()));
        Ok(())
    }
}

/// I2C EEPROM with 8 byte pages, blank (0xFF) at start.
pub struct MemEeprom {
    pub mem: Vec<u8>,
    /// Offset of every page write, in order.
    pub page_writes: Vec<u32>,
    pub fail_page: Option<u32>,
    pub fail_reads: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromError;

impl MemEeprom {
    pub fn new() -> Self {
        Self {
            mem: vec![0xFF; 256],
            page_writes: Vec::new(),
            fail_page: None,
            fail_reads: false,
        }
    }
}

impl ReadStorage for MemEeprom {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail_reads {
            return Err(EepromError);
        }
        let start = offset as usize;
        bytes.copy_from_slice(&self.mem[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.mem.len()
    }
}

impl PagedStorage for MemEeprom {
    const PAGE_SIZE: usize = 8;

    fn write_page(&mut self, offset: u32, page: &[u8]) -> Result<(), Self::Error> {
        if self.fail_page == Some(offset) || page.len() != Self::PAGE_SIZE {
            return Err(EepromError);
        }
        let start = offset as usize;
        self.mem[start..start + page.len()].copy_from_slice(page);
        self.page_writes.push(offset);
        Ok(())
    }
}

/// UART that remembers every byte sent.
#[derive(Default)]
pub struct RecordingSerial {
    pub sent: Vec<u8>,
}

impl serial::Write<u8> for RecordingSerial {
    type Error = core::convert::Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.sent.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

/// Console whose inbound segments are queued up front by the test.
pub struct TestConsole<S> {
    pub serial: S,
    pub inbound: VecDeque<Segment>,
}

impl<S> TestConsole<S> {
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            inbound: VecDeque::new(),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        let segment = Segment::from_slice(bytes).expect("segment too long");
        self.inbound.push_back(segment);
    }
}

impl TestConsole<RecordingSerial> {
    pub fn sent(&self) -> &[u8] {
        &self.serial.sent
    }
}

impl<S: serial::Write<u8>> serial::Write<u8> for TestConsole<S> {
    type Error = S::Error;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.serial.write(word)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.serial.flush()
    }
}

impl<S: serial::Write<u8>> Console for TestConsole<S> {
    fn poll_segment(&mut self) -> Option<Segment> {
        self.inbound.pop_front()
    }
}

/// Records what a real system would have done to the core.
#[derive(Default)]
pub struct FakeSystem {
    pub resets: usize,
    pub deinits: usize,
    pub launched: Option<VectorTable>,
}

impl System for FakeSystem {
    fn reset(&mut self) {
        self.resets += 1;
    }

    fn deinit_peripherals(&mut self) {
        self.deinits += 1;
    }

    unsafe fn start_application(&mut self, vectors: &VectorTable) {
        self.launched = Some(*vectors);
    }
}

pub struct FakeBoard<S>(PhantomData<S>);

impl<S: serial::Write<u8>> Board for FakeBoard<S> {
    type InternalFlash = MemFlash;
    type ExternalFlash = MemFlash;
    type Eeprom = MemEeprom;
    type Console = TestConsole<S>;
    type Delay = MockNoop;
    type System = FakeSystem;
}

/// Board whose UART output is recorded.
pub type TestBoard = FakeBoard<RecordingSerial>;
/// Board whose UART output is checked against expected transactions.
pub type MockBoard = FakeBoard<Mock<u8>>;

impl<S: serial::Write<u8>> FakeBoard<S> {
    pub fn peripherals(serial: S) -> Peripherals<Self> {
        Peripherals {
            internal_flash: MemFlash::internal(),
            external_flash: MemFlash::external(),
            eeprom: MemEeprom::new(),
            console: TestConsole::new(serial),
            delay: MockNoop::new(),
            system: FakeSystem::default(),
        }
    }
}

impl FakeBoard<RecordingSerial> {
    pub fn parts() -> Parts<Self> {
        Parts::new(&STM32F103C8, Self::peripherals(RecordingSerial::default())).unwrap()
    }
}

impl FakeBoard<Mock<u8>> {
    pub fn parts(expectations: &[Transaction<u8>]) -> Parts<Self> {
        Parts::new(&STM32F103C8, Self::peripherals(Mock::new(expectations))).unwrap()
    }
}

impl<S: serial::Write<u8>> Parts<FakeBoard<S>> {
    pub fn internal_flash(&self) -> &MemFlash {
        self.internal.driver()
    }

    pub fn internal_flash_mut(&mut self) -> &mut MemFlash {
        self.internal.driver_mut()
    }

    pub fn external_flash(&self) -> &MemFlash {
        self.external.driver()
    }

    pub fn external_flash_mut(&mut self) -> &mut MemFlash {
        self.external.driver_mut()
    }

    pub fn eeprom(&self) -> &MemEeprom {
        self.store.storage()
    }

    pub fn eeprom_mut(&mut self) -> &mut MemEeprom {
        self.store.storage_mut()
    }
}
