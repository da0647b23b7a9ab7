// Public interfaces.
pub mod types;

use embedded_hal::blocking::delay::DelayMs;
use embedded_storage::ReadStorage;

use crate::config::{EEPROM_PAGE_SIZE, METADATA_OFFSET, PAGE_WRITE_DELAY_MS};
use crate::fmt::{error, info};
use crate::types::Error;

use self::types::{SlotMetadata, RECORD_SIZE};

// The record has to split into whole EEPROM pages.
const _: () = assert!(RECORD_SIZE % EEPROM_PAGE_SIZE == 0);

/// Byte-addressable persistent memory that is programmed one page at a time (I2C EEPROM).
pub trait PagedStorage: ReadStorage {
    const PAGE_SIZE: usize;

    /// Programs one page. `page.len()` is always `PAGE_SIZE`.
    fn write_page(&mut self, offset: u32, page: &[u8]) -> Result<(), Self::Error>;
}

/// Reads and writes the [`SlotMetadata`] record at the start of the EEPROM.
pub struct MetadataStore<E> {
    storage: E,
}

impl<E: PagedStorage> MetadataStore<E> {
    pub fn new(storage: E) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &E {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut E {
        &mut self.storage
    }

    /// Reads the record. A failed read is an error, never a zeroed record.
    pub fn load(&mut self) -> Result<SlotMetadata, Error> {
        let mut bytes = [0u8; RECORD_SIZE];
        self.storage
            .read(METADATA_OFFSET, &mut bytes)
            .map_err(|_| {
                error!("Failed to read metadata record");
                Error::MetadataRead
            })?;

        Ok(SlotMetadata::decode(&bytes))
    }

    pub fn save<D: DelayMs<u32>>(
        &mut self,
        record: &SlotMetadata,
        delay: &mut D,
    ) -> Result<(), Error> {
        self.save_bytes(&record.encode(), delay)
    }

    /// Writes `bytes` page by page, waiting out the write cycle after each
    /// page. Stops at the first page that fails.
    pub fn save_bytes<D: DelayMs<u32>>(&mut self, bytes: &[u8], delay: &mut D) -> Result<(), Error> {
        let page_size = E::PAGE_SIZE;
        if page_size == 0 || bytes.len() % page_size != 0 {
            error!(
                "Invalid record size (must be {}-byte aligned): {}",
                page_size,
                bytes.len()
            );
            return Err(Error::MisalignedRecord { size: bytes.len() });
        }

        for (page, data) in bytes.chunks_exact(page_size).enumerate() {
            let offset = METADATA_OFFSET + (page * page_size) as u32;
            self.storage.write_page(offset, data).map_err(|_| {
                error!("Failed to write EEPROM page {}", page);
                Error::MetadataWrite { page }
            })?;
            delay.delay_ms(PAGE_WRITE_DELAY_MS);
        }

        info!("Metadata saved to EEPROM");
        info!("  Size      : {} bytes", bytes.len());
        info!("  Page size : {} bytes", page_size);
        info!("  Pages     : {}", bytes.len() / page_size);
        Ok(())
    }

    /// Load, modify, save. Nothing is written if `f` fails.
    pub fn update<D, F>(&mut self, delay: &mut D, f: F) -> Result<SlotMetadata, Error>
    where
        D: DelayMs<u32>,
        F: FnOnce(&mut SlotMetadata) -> Result<(), Error>,
    {
        let mut record = self.load()?;
        f(&mut record)?;
        self.save(&record, delay)?;
        Ok(record)
    }
}
