// Public interfaces.
pub mod types;

use embedded_storage::nor_flash::{NorFlash, NorFlashError};

use crate::config::types::{AppPartition, SlotLayout};
use crate::config::CHUNK_SIZE;
use crate::fmt::{debug, error, info};
use crate::types::{Error, FlashFault};

use self::types::UpdateChunk;

/// Destination for full and partial update chunks.
///
/// Both writers take the same chunk index, so the transfer receiver and the
/// slot copy don't care which storage sits behind it.
pub trait ChunkWriter {
    fn write_chunk(&mut self, index: u32, chunk: &UpdateChunk, len: usize) -> Result<(), Error>;
}

fn internal_fault<E: NorFlashError>(e: E) -> Error {
    Error::InternalFlash(FlashFault::of(e))
}

fn external_fault<E: NorFlashError>(e: E) -> Error {
    Error::ExternalFlash(FlashFault::of(e))
}

/// Application partition of the MCU's own flash.
pub struct InternalFlash<F> {
    flash: F,
    partition: AppPartition,
}

impl<F: NorFlash> InternalFlash<F> {
    pub fn new(flash: F, partition: AppPartition) -> Self {
        Self { flash, partition }
    }

    pub fn partition(&self) -> &AppPartition {
        &self.partition
    }

    pub fn driver(&self) -> &F {
        &self.flash
    }

    pub fn driver_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Erases the whole application partition and, where the part allows it,
    /// checks that every word reads back erased.
    pub fn erase_partition(&mut self) -> Result<(), Error> {
        let from = self.partition.offset();
        let to = from + self.partition.size;

        info!(
            "Erasing APP partition {:#x}..{:#x}",
            self.partition.start,
            self.partition.end()
        );
        self.flash.erase(from, to).map_err(internal_fault)?;

        if self.partition.verify_erase {
            self.verify_erased()?;
        }

        Ok(())
    }

    fn verify_erased(&mut self) -> Result<(), Error> {
        let mut buf = [0u8; 64];
        let mut bad_words = 0u32;
        let mut offset = self.partition.offset();
        let end = offset + self.partition.size;

        while offset < end {
            let len = buf.len().min((end - offset) as usize);
            self.flash
                .read(offset, &mut buf[..len])
                .map_err(internal_fault)?;
            bad_words += buf[..len]
                .chunks_exact(4)
                .filter(|word| *word != [0xFF; 4])
                .count() as u32;
            offset += len as u32;
        }

        if bad_words != 0 {
            error!("Erase verify failed, {} words not erased", bad_words);
            return Err(Error::EraseVerify { bad_words });
        }

        Ok(())
    }

    /// Reads one little-endian word at an absolute address inside the partition.
    pub fn read_word(&mut self, address: u32) -> Result<u32, Error> {
        if !self.partition.contains(address) || !self.partition.contains(address + 3) {
            return Err(Error::OutOfBounds(address));
        }

        let mut word = [0u8; 4];
        self.flash
            .read(address - self.partition.flash_base, &mut word)
            .map_err(internal_fault)?;

        Ok(u32::from_le_bytes(word))
    }
}

impl<F: NorFlash> ChunkWriter for InternalFlash<F> {
    /// Writes exactly `len` bytes so a short final chunk doesn't touch the space after the image.
    fn write_chunk(&mut self, index: u32, chunk: &UpdateChunk, len: usize) -> Result<(), Error> {
        let offset = self.partition.chunk_offset(index, len)?;
        self.flash
            .write(offset, chunk.bytes(len))
            .map_err(internal_fault)?;

        debug!("Chunk {} written to {:#x} ({} bytes)", index, offset, len);
        Ok(())
    }
}

/// SPI NOR flash split into firmware slots. Remembers the slot the current
/// download or load works on.
pub struct ExternalFlash<F> {
    flash: F,
    layout: SlotLayout,
    slot: u8,
}

impl<F: NorFlash> ExternalFlash<F> {
    /// Refuses a geometry that can't be programmed in whole pages.
    pub fn new(flash: F, layout: SlotLayout) -> Result<Self, Error> {
        layout.check().map_err(|e| {
            error!(
                "Unusable external flash layout: page {} block {}",
                layout.page_size, layout.block_size
            );
            e
        })?;

        Ok(Self {
            flash,
            layout,
            slot: 0,
        })
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    pub fn driver(&self) -> &F {
        &self.flash
    }

    pub fn driver_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn select_slot(&mut self, slot: u8) {
        self.slot = slot;
    }

    /// Erases every block of `slot`. Stops at the first block that fails.
    pub fn erase_slot(&mut self, slot: u8) -> Result<(), Error> {
        let blocks = self.layout.blocks_per_slot;
        info!("Erasing the {}th firmware of external Flash...", slot);

        for block in 0..blocks {
            let from = self.layout.block_address(slot, block)?;
            self.flash
                .erase(from, from + self.layout.block_size)
                .map_err(|e| {
                    error!("Failed to erase block {} of slot {}", block, slot);
                    external_fault(e)
                })?;
            info!("Erased block {}/{}", block + 1, blocks);
        }

        Ok(())
    }

    pub fn read_chunk(
        &mut self,
        slot: u8,
        index: u32,
        chunk: &mut UpdateChunk,
        len: usize,
    ) -> Result<(), Error> {
        if len > CHUNK_SIZE {
            return Err(Error::OutOfBounds(len as u32));
        }

        let address = self.layout.address(slot, index, 0)?;
        self.flash
            .read(address, &mut chunk.as_mut_slice()[..len])
            .map_err(external_fault)
    }
}

impl<F: NorFlash> ChunkWriter for ExternalFlash<F> {
    /// Programs whole pages. A short final chunk is rounded up, the bytes past
    /// `len` land in erased space and the true length lives in the metadata.
    fn write_chunk(&mut self, index: u32, chunk: &UpdateChunk, len: usize) -> Result<(), Error> {
        if len > CHUNK_SIZE {
            return Err(Error::OutOfBounds(len as u32));
        }

        let page = self.layout.page_size as usize;
        let pages = (len + page - 1) / page;

        for n in 0..pages {
            let start = n * page;
            let address = self.layout.address(self.slot, index, start as u32)?;
            self.flash
                .write(address, &chunk.as_slice()[start..start + page])
                .map_err(external_fault)?;
        }

        debug!(
            "Chunk {} written to slot {} ({} pages)",
            index, self.slot, pages
        );
        Ok(())
    }
}
