// Public interfaces.
pub mod types;

use types::{AppPartition, Layout, RamRegion, SlotLayout};

/// Bytes moved per flash write. One F1 page.
pub const CHUNK_SIZE: usize = 1024;

/// External flash slots. Slot 0 is written by the OTA agent only.
pub const SLOT_COUNT: usize = 10;
pub const OTA_SLOT: u8 = 0;

pub const VERSION_LEN: usize = 20;
/// Written by the OTA agent into the metadata record to request a copy out of slot 0.
pub const UPDATE_PENDING: u32 = 0xAABB_1122;

pub const EEPROM_PAGE_SIZE: usize = 8;
pub const METADATA_OFFSET: u32 = 0x0000;

pub const BOOT_WINDOW_MS: u32 = 2000;
pub const HANDSHAKE_INTERVAL_MS: u32 = 1000;
pub const PAGE_WRITE_DELAY_MS: u32 = 5;
pub const RESET_DELAY_MS: u32 = 200;
pub const ENTRY_KEYS: [u8; 2] = [b'w', b'W'];

const FLASH_BASE: u32 = 0x0800_0000;
const RAM_BASE: u32 = 0x2000_0000;

// W25Q: 256 byte pages, 64K blocks, 1M per slot.
const W25Q_SLOTS: SlotLayout = SlotLayout {
    page_size: 256,
    block_size: 64 * 1024,
    blocks_per_slot: 16,
    slot_count: SLOT_COUNT as u8,
};

// 64 x 1K pages, the first 24 hold the bootloader.
pub const STM32F103C8: Layout = Layout {
    app: AppPartition {
        flash_base: FLASH_BASE,
        start: FLASH_BASE + 24 * 1024,
        size: 40 * 1024,
        verify_erase: true,
    },
    ram: RamRegion {
        base: RAM_BASE,
        size: 20 * 1024,
    },
    slots: W25Q_SLOTS,
};

pub const GD32F103C8: Layout = STM32F103C8;

// Sectors 0 and 1 hold the bootloader, the app gets sectors 2 to 11.
pub const STM32F405RG: Layout = Layout {
    app: AppPartition {
        flash_base: FLASH_BASE,
        start: FLASH_BASE + 0x8000,
        size: 1024 * 1024 - 0x8000,
        verify_erase: false,
    },
    ram: RamRegion {
        base: RAM_BASE,
        size: 128 * 1024,
    },
    slots: W25Q_SLOTS,
};

#[cfg(feature = "stm32f405rg")]
pub const LAYOUT: Layout = STM32F405RG;

#[cfg(all(feature = "gd32f103c8", not(feature = "stm32f405rg")))]
pub const LAYOUT: Layout = GD32F103C8;

#[cfg(not(any(feature = "gd32f103c8", feature = "stm32f405rg")))]
pub const LAYOUT: Layout = STM32F103C8;

const _: () = assert!(CHUNK_SIZE % W25Q_SLOTS.page_size as usize == 0);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Error;

    #[test]
    fn f103_app_partition_starts_after_bootloader() {
        assert_eq!(STM32F103C8.app.start, 0x0800_6000);
        assert_eq!(STM32F103C8.app.offset(), 0x6000);
        assert_eq!(STM32F103C8.app.end(), 0x0801_0000);
    }

    #[test]
    fn f405_app_partition_spans_remaining_sectors() {
        assert_eq!(STM32F405RG.app.start, 0x0800_8000);
        assert_eq!(STM32F405RG.app.end(), 0x0810_0000);
    }

    #[test]
    fn chunk_offsets_stay_inside_partition() {
        let app = STM32F103C8.app;
        assert_eq!(app.chunk_offset(0, CHUNK_SIZE), Ok(0x6000));
        assert_eq!(app.chunk_offset(3, 512), Ok(0x6000 + 3 * 1024));
        assert_eq!(app.chunk_offset(39, CHUNK_SIZE), Ok(0x6000 + 39 * 1024));
        assert!(app.chunk_offset(40, 4).is_err());
        assert!(app.chunk_offset(0, CHUNK_SIZE + 1).is_err());
        assert!(app.chunk_offset(u32::MAX, 4).is_err());
    }

    #[test]
    fn slot_addresses() {
        let slots = W25Q_SLOTS;
        assert_eq!(slots.slot_size(), 0x10_0000);
        assert_eq!(slots.address(0, 0, 0), Ok(0));
        assert_eq!(slots.address(5, 2, 256), Ok(5 * 0x10_0000 + 2 * 1024 + 256));
        assert_eq!(slots.address(9, 1023, 768), Ok(9 * 0x10_0000 + 0xF_FF00));
        assert_eq!(slots.address(10, 0, 0), Err(Error::InvalidSlot(10)));
        assert_eq!(slots.address(1, 1024, 0), Err(Error::OutOfBounds(0x10_0000)));
    }

    #[test]
    fn block_addresses() {
        let slots = W25Q_SLOTS;
        assert_eq!(slots.block_address(5, 0), Ok(0x50_0000));
        assert_eq!(slots.block_address(5, 15), Ok(0x5F_0000));
        assert!(slots.block_address(5, 16).is_err());
    }

    #[test]
    fn target_slot_layouts_are_addressable() {
        assert_eq!(STM32F103C8.slots.check(), Ok(()));
        assert_eq!(STM32F405RG.slots.check(), Ok(()));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let slots = SlotLayout {
            page_size: 0,
            ..W25Q_SLOTS
        };
        assert_eq!(slots.check(), Err(Error::InvalidLayout));
    }

    #[test]
    fn page_must_divide_chunk() {
        let slots = SlotLayout {
            page_size: 384,
            block_size: 384 * 1024,
            ..W25Q_SLOTS
        };
        assert_eq!(slots.check(), Err(Error::InvalidLayout));
    }

    #[test]
    fn page_must_divide_block() {
        let slots = SlotLayout {
            block_size: 64 * 1024 + 128,
            ..W25Q_SLOTS
        };
        assert_eq!(slots.check(), Err(Error::InvalidLayout));
    }

    #[test]
    fn oversized_geometry_is_rejected() {
        let slots = SlotLayout {
            blocks_per_slot: 0x1_0000,
            ..W25Q_SLOTS
        };
        assert_eq!(slots.check(), Err(Error::InvalidLayout));
        assert_eq!(slots.slot_size(), u32::MAX);
        assert_eq!(slots.address(9, 0, 0), Err(Error::OutOfBounds(u32::MAX)));

        let empty = SlotLayout {
            slot_count: 0,
            ..W25Q_SLOTS
        };
        assert_eq!(empty.check(), Err(Error::InvalidLayout));
    }

    #[test]
    fn stack_pointer_range() {
        let ram = STM32F103C8.ram;
        assert!(ram.holds_stack_pointer(0x2000_0000));
        assert!(ram.holds_stack_pointer(0x2000_4FFC));
        assert!(ram.holds_stack_pointer(0x2000_5000));
        assert!(!ram.holds_stack_pointer(0x2000_5004));
        assert!(!ram.holds_stack_pointer(0x1FFF_FFFC));
        assert!(!ram.holds_stack_pointer(0xFFFF_FFFF));
    }
}
