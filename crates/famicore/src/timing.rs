//! NTSC PPU raster timing.
//!
//! The mapper schedules its scanline IRQ and CHR fetch-context switches from
//! the raw PPU cycle counter supplied by the PPU core, so the cycle-to-raster
//! conversion lives here in one place.

/// PPU cycles (dots) per scanline.
pub const CYCLES_PER_SCANLINE: u32 = 341;
/// Total scanlines per NTSC frame, including vblank and the pre-render line.
pub const SCANLINES_PER_FRAME: u32 = 262;
/// PPU cycles per NTSC frame.
pub const CYCLES_PER_FRAME: u32 = CYCLES_PER_SCANLINE * SCANLINES_PER_FRAME;

/// Last visible scanline (0-based). Lines 240..=261 are post-render/vblank.
pub const LAST_VISIBLE_LINE: u32 = 239;

/// Raster columns 256..=319 carry the PPU's sprite pattern fetches; the
/// MMC5 switches its CHR bank set on this window.
pub const SPRITE_FETCH_COLUMN_START: u32 = 256;
pub const SPRITE_FETCH_COLUMN_END: u32 = 319;

/// Raster line (0..262) for a PPU cycle counter.
pub fn raster_line(ppu_cycle: u32) -> u32 {
    (ppu_cycle % CYCLES_PER_FRAME) / CYCLES_PER_SCANLINE
}

/// Raster column (dot within the scanline, 0..341) for a PPU cycle counter.
pub fn raster_column(ppu_cycle: u32) -> u32 {
    ppu_cycle % CYCLES_PER_SCANLINE
}

/// First PPU cycle of the given raster line (within the first frame).
pub fn line_start_cycle(line: u32) -> u32 {
    line * CYCLES_PER_SCANLINE
}

/// Whether the given PPU cycle falls inside the sprite pattern fetch window.
pub fn in_sprite_fetch(ppu_cycle: u32) -> bool {
    let column = raster_column(ppu_cycle);
    (SPRITE_FETCH_COLUMN_START..=SPRITE_FETCH_COLUMN_END).contains(&column)
}
