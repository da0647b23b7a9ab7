use crate::config::{SLOT_COUNT, UPDATE_PENDING, VERSION_LEN};
use crate::types::Error;

/// Persisted size of [`SlotMetadata`]. Sizes, then version, then the pending sentinel.
pub const RECORD_SIZE: usize = SLOT_COUNT * 4 + VERSION_LEN + 4;

const VERSION_AT: usize = SLOT_COUNT * 4;
const PENDING_AT: usize = VERSION_AT + VERSION_LEN;

/// Firmware bookkeeping shared with the OTA application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotMetadata {
    /// Bytes actually written to each external slot.
    pub image_sizes: [u32; SLOT_COUNT],
    /// NUL terminated.
    pub version: [u8; VERSION_LEN],
    pub update_pending: u32,
}

impl Default for SlotMetadata {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl SlotMetadata {
    pub const fn zeroed() -> Self {
        Self {
            image_sizes: [0; SLOT_COUNT],
            version: [0; VERSION_LEN],
            update_pending: 0,
        }
    }

    /// Little-endian, same byte order the MCU keeps it in RAM.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];

        for (dst, size) in bytes[..VERSION_AT]
            .chunks_exact_mut(4)
            .zip(self.image_sizes.iter())
        {
            dst.copy_from_slice(&size.to_le_bytes());
        }
        bytes[VERSION_AT..PENDING_AT].copy_from_slice(&self.version);
        bytes[PENDING_AT..].copy_from_slice(&self.update_pending.to_le_bytes());

        bytes
    }

    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut record = Self::zeroed();

        for (size, src) in record
            .image_sizes
            .iter_mut()
            .zip(bytes[..VERSION_AT].chunks_exact(4))
        {
            *size = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        }
        record.version.copy_from_slice(&bytes[VERSION_AT..PENDING_AT]);
        record.update_pending = u32::from_le_bytes([
            bytes[PENDING_AT],
            bytes[PENDING_AT + 1],
            bytes[PENDING_AT + 2],
            bytes[PENDING_AT + 3],
        ]);

        record
    }

    pub fn image_size(&self, slot: u8) -> Result<u32, Error> {
        self.image_sizes
            .get(slot as usize)
            .copied()
            .ok_or(Error::InvalidSlot(slot))
    }

    pub fn set_image_size(&mut self, slot: u8, size: u32) -> Result<(), Error> {
        let entry = self
            .image_sizes
            .get_mut(slot as usize)
            .ok_or(Error::InvalidSlot(slot))?;
        *entry = size;
        Ok(())
    }

    /// Version up to the first NUL. Bytes that aren't UTF-8 show as "?".
    pub fn version_str(&self) -> &str {
        let len = self
            .version
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VERSION_LEN);
        core::str::from_utf8(&self.version[..len]).unwrap_or("?")
    }

    /// Needs room for the NUL, so at most 19 bytes.
    pub fn set_version(&mut self, version: &[u8]) -> Result<(), Error> {
        if version.len() >= VERSION_LEN {
            return Err(Error::VersionTooLong(version.len()));
        }

        self.version = [0; VERSION_LEN];
        self.version[..version.len()].copy_from_slice(version);
        Ok(())
    }

    pub fn is_update_pending(&self) -> bool {
        self.update_pending == UPDATE_PENDING
    }
}
