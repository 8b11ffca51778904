//! MMC5 (mapper 5) cartridge board emulation with expansion audio.
//!
//! The crate models the cartridge side of the console bus: iNES loading,
//! the mapper's CPU/PPU address windows, banking, the scanline interrupt
//! counter, nametable/fill control, and the on-board audio channels with
//! their amplitude mixer. The CPU/PPU cores live in the host; they drive the
//! [`Cartridge`] through `low_*`/`high_*`/`chr_*` accesses plus the per-cycle
//! `sync_cpu`/`sync_ppu` notifications and poll the shared IRQ line.

pub mod apu;
pub mod audio;
pub mod cartridge;
pub mod error;
pub mod interrupt;
pub mod memory;
pub mod reset_kind;
pub mod timing;

pub use cartridge::{
    Cartridge, Mapper, Mapper5, MapperEvent, NametableTarget, load_cartridge,
    load_cartridge_from_file,
};
pub use error::Error;
pub use reset_kind::ResetKind;
