use crate::config::CHUNK_SIZE;
use crate::types::Error;

// Declarations

/// Application region of internal flash. Addresses are absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppPartition {
    /// Address the internal flash driver counts its offsets from.
    pub flash_base: u32,
    pub start: u32,
    pub size: u32,
    /// Read every word back after an erase. F1 parts only, F4 sector erase isn't checked.
    pub verify_erase: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RamRegion {
    pub base: u32,
    pub size: u32,
}

/// External flash split into equally sized firmware slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotLayout {
    pub page_size: u32,
    pub block_size: u32,
    pub blocks_per_slot: u32,
    pub slot_count: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    pub app: AppPartition,
    pub ram: RamRegion,
    pub slots: SlotLayout,
}

//
// Implementations
//

impl AppPartition {
    /// Offset of the partition relative to `flash_base`.
    pub const fn offset(&self) -> u32 {
        self.start - self.flash_base
    }

    pub const fn end(&self) -> u32 {
        self.start + self.size
    }

    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address < self.end()
    }

    /// Driver offset of `len` bytes written at chunk `index`.
    pub fn chunk_offset(&self, index: u32, len: usize) -> Result<u32, Error> {
        let start = index
            .checked_mul(CHUNK_SIZE as u32)
            .ok_or(Error::OutOfBounds(u32::MAX))?;
        let end = start
            .checked_add(len as u32)
            .ok_or(Error::OutOfBounds(u32::MAX))?;

        if len > CHUNK_SIZE || end > self.size {
            return Err(Error::OutOfBounds(self.start.wrapping_add(start)));
        }

        Ok(self.offset() + start)
    }
}

impl RamRegion {
    /// The initial stack pointer of a full-descending stack may sit one past the last RAM byte.
    pub const fn holds_stack_pointer(&self, sp: u32) -> bool {
        sp >= self.base && sp - self.base <= self.size
    }
}

impl SlotLayout {
    /// Saturates on geometries that [`SlotLayout::check`] rejects.
    pub const fn slot_size(&self) -> u32 {
        match self.block_size.checked_mul(self.blocks_per_slot) {
            Some(size) => size,
            None => u32::MAX,
        }
    }

    /// Pages must split both a chunk and an erase block, and every slot has
    /// to be addressable in 32 bits.
    pub fn check(&self) -> Result<(), Error> {
        let page = self.page_size as usize;
        if page == 0 || CHUNK_SIZE % page != 0 || self.block_size % self.page_size != 0 {
            return Err(Error::InvalidLayout);
        }

        let total = self
            .block_size
            .checked_mul(self.blocks_per_slot)
            .and_then(|slot| slot.checked_mul(self.slot_count as u32));
        match total {
            Some(total) if total > 0 => Ok(()),
            _ => Err(Error::InvalidLayout),
        }
    }

    /// Address of `page_offset` inside chunk `chunk` of `slot`.
    pub fn address(&self, slot: u8, chunk: u32, page_offset: u32) -> Result<u32, Error> {
        let within = chunk
            .checked_mul(CHUNK_SIZE as u32)
            .and_then(|start| start.checked_add(page_offset))
            .ok_or(Error::OutOfBounds(u32::MAX))?;

        self.offset_in_slot(slot, within)
    }

    pub fn block_address(&self, slot: u8, block: u32) -> Result<u32, Error> {
        if block >= self.blocks_per_slot {
            return Err(Error::OutOfBounds(block));
        }
        let within = block
            .checked_mul(self.block_size)
            .ok_or(Error::OutOfBounds(u32::MAX))?;
        self.offset_in_slot(slot, within)
    }

    fn offset_in_slot(&self, slot: u8, within: u32) -> Result<u32, Error> {
        if slot >= self.slot_count {
            return Err(Error::InvalidSlot(slot));
        }
        if within >= self.slot_size() {
            return Err(Error::OutOfBounds(within));
        }

        (slot as u32)
            .checked_mul(self.slot_size())
            .and_then(|base| base.checked_add(within))
            .ok_or(Error::OutOfBounds(u32::MAX))
    }
}
