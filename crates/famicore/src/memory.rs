//! Shared definitions for the cartridge-visible memory map.
//!
//! Centralizing address-related constants keeps the hardware layout in one
//! location and prevents magic numbers from sneaking into the mapper and
//! channel modules.

/// CPU-side cartridge memory map details.
pub mod cpu {
    /// First address dispatched to the mapper's low entry points (`$4020`).
    pub const LOW_WINDOW_START: u16 = 0x4020;
    /// Last low-window address (`$7FFF`); everything above is the PRG window.
    pub const LOW_WINDOW_END: u16 = 0x7FFF;

    /// First address of the MMC5 internal ExRAM CPU window (`$5C00`).
    pub const EXRAM_START: u16 = 0x5C00;
    /// Last address of the ExRAM CPU window (`$5FFF`).
    pub const EXRAM_END: u16 = 0x5FFF;

    /// First address of the bankswitched SRAM window (`$6000`).
    pub const SRAM_WINDOW_START: u16 = 0x6000;
    /// Last address of the bankswitched SRAM window (`$7FFF`).
    pub const SRAM_WINDOW_END: u16 = 0x7FFF;

    /// First address of the bankswitched PRG-ROM/PRG-RAM space (`$8000`).
    pub const PRG_WINDOW_START: u16 = 0x8000;
    /// Size of one PRG CPU window (8 KiB); four of them cover `$8000-$FFFF`.
    pub const PRG_WINDOW_SIZE: usize = 8 * 1024;
    /// Number of PRG CPU windows.
    pub const PRG_WINDOW_COUNT: usize = 4;
}

/// Virtual SRAM geometry. The MMC5 board model carries eight 8 KiB pages of
/// battery-backed RAM selectable per CPU window.
pub mod sram {
    /// Size of one SRAM page (matches the 8 KiB PRG window).
    pub const PAGE_SIZE: usize = 8 * 1024;
    /// Number of addressable SRAM pages (bank selects are masked to this).
    pub const PAGE_COUNT: usize = 8;
    /// Total virtual SRAM size.
    pub const TOTAL_SIZE: usize = PAGE_SIZE * PAGE_COUNT;
    /// Mask applied to SRAM page selects.
    pub const PAGE_MASK: u8 = (PAGE_COUNT - 1) as u8;
}

/// PPU-side cartridge memory map details.
pub mod ppu {
    /// Size of one CHR page at the finest banking granularity (1 KiB).
    pub const CHR_PAGE_SIZE: usize = 1024;
    /// Number of CHR slots visible in pattern table space (8 x 1 KiB).
    pub const CHR_SLOT_COUNT: usize = 8;
    /// Last pattern table address (`$1FFF`); nametables start above.
    pub const PATTERN_TABLE_END: u16 = 0x1FFF;
    /// First nametable address (`$2000`).
    pub const NAMETABLE_START: u16 = 0x2000;
}
