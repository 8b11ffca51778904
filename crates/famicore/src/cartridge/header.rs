//! iNES header parsing.
//!
//! The first 16 bytes of a `.nes` dump describe the cartridge: PRG/CHR
//! section sizes, the mapper id, and a few board flags. [`Header::parse`]
//! validates the magic bytes and exposes the fields the loader needs to slice
//! the ROM image and construct the mapper.

use bitflags::bitflags;

use crate::error::Error;

const NES_MAGIC: &[u8; 4] = b"NES\x1A";

/// Size of the fixed iNES header in bytes.
pub const NES_HEADER_LEN: usize = 16;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags6: u8 {
        const MIRRORING       = 0b0000_0001;
        const BATTERY         = 0b0000_0010;
        const TRAINER         = 0b0000_0100;
        const FOUR_SCREEN     = 0b0000_1000;
        const MAPPER_LOW_MASK = 0b1111_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags7: u8 {
        const MAPPER_HIGH_MASK = 0b1111_0000;
    }
}

/// Solder-pad nametable layout declared by the header. The MMC5 overrides
/// this at runtime through its nametable control register, so the value is
/// informational for this board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Parsed iNES cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Mapper ID (5 == MMC5).
    pub mapper: u16,
    /// How the PPU nametables are wired absent mapper control.
    pub mirroring: Mirroring,
    /// Battery bit: the cartridge keeps RAM contents when powered off.
    pub battery_backed_ram: bool,
    /// Whether a 512 byte trainer block sits between the header and PRG data.
    pub trainer_present: bool,
    /// Amount of PRG ROM in bytes.
    pub prg_rom_size: usize,
    /// Amount of CHR ROM in bytes. Zero means the board carries CHR RAM.
    pub chr_rom_size: usize,
}

impl Header {
    /// Parse an iNES header from the given byte slice.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < NES_HEADER_LEN {
            return Err(Error::TooShort {
                actual: bytes.len(),
            });
        }

        if &bytes[0..4] != NES_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let prg_rom_units = bytes[4] as usize;
        let chr_rom_units = bytes[5] as usize;
        let flags6 = Flags6::from_bits_truncate(bytes[6]);
        let flags7 = Flags7::from_bits_truncate(bytes[7]);

        Ok(Self {
            mapper: combine_mapper(flags6, flags7),
            mirroring: resolve_mirroring(flags6),
            battery_backed_ram: flags6.contains(Flags6::BATTERY),
            trainer_present: flags6.contains(Flags6::TRAINER),
            prg_rom_size: prg_rom_units * 16 * 1024,
            chr_rom_size: chr_rom_units * 8 * 1024,
        })
    }
}

fn resolve_mirroring(flags6: Flags6) -> Mirroring {
    if flags6.contains(Flags6::FOUR_SCREEN) {
        Mirroring::FourScreen
    } else if flags6.contains(Flags6::MIRRORING) {
        Mirroring::Vertical
    } else {
        Mirroring::Horizontal
    }
}

fn combine_mapper(flags6: Flags6, flags7: Flags7) -> u16 {
    let lower = (flags6.bits() >> 4) as u16;
    let upper = (flags7.bits() & 0xF0) as u16;
    lower | upper
}
