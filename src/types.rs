use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// Reduced view of a NOR flash failure that can be carried inside [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashFault {
    NotAligned,
    OutOfBounds,
    Other,
}

impl From<NorFlashErrorKind> for FlashFault {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => FlashFault::NotAligned,
            NorFlashErrorKind::OutOfBounds => FlashFault::OutOfBounds,
            _ => FlashFault::Other,
        }
    }
}

impl FlashFault {
    pub fn of<E: NorFlashError>(error: E) -> Self {
        error.kind().into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Input segment had the wrong length for the handler that received it.
    InvalidLength(usize),
    InvalidCommand(u8),
    /// Slot selector outside '1'..='9'. Slot 0 belongs to remote updates.
    InvalidSlot(u8),
    VersionTooLong(usize),
    /// Computed address falls outside the application partition or the slot.
    OutOfBounds(u32),
    InternalFlash(FlashFault),
    ExternalFlash(FlashFault),
    /// Number of words that did not read back as 0xFFFF_FFFF after an erase.
    EraseVerify { bad_words: u32 },
    MetadataRead,
    /// Index of the first persistent page that failed to program.
    MetadataWrite { page: usize },
    MisalignedRecord { size: usize },
    /// Recorded image size is not a multiple of 4.
    MisalignedImage(u32),
    /// Slot has no recorded image.
    EmptyImage(u8),
    /// External flash geometry that can't be addressed in whole pages.
    InvalidLayout,
    InvalidStackPointer(u32),
    InvalidResetVector(u32),
    Console,
}
