use std::{fs, path::Path};

use crate::{
    cartridge::header::{Header, NES_HEADER_LEN},
    error::Error,
    reset_kind::ResetKind,
};

pub const TRAINER_SIZE: usize = 512;

pub mod header;
pub mod mapper;
pub use mapper::{Mapper, Mapper5, MapperEvent, NametableTarget};

#[derive(Debug)]
pub struct Cartridge {
    header: Header,
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    pub fn new(header: Header, mapper: Box<dyn Mapper>) -> Self {
        Self { header, mapper }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }

    pub fn mapper_mut(&mut self) -> &mut dyn Mapper {
        self.mapper.as_mut()
    }

    pub fn reset(&mut self, kind: ResetKind) {
        self.mapper.reset(kind);
    }

    pub fn low_read(&mut self, addr: u16) -> u8 {
        self.mapper.low_read(addr)
    }

    pub fn low_write(&mut self, addr: u16, data: u8) {
        self.mapper.low_write(addr, data);
    }

    pub fn high_read(&self, addr: u16) -> u8 {
        self.mapper.high_read(addr)
    }

    pub fn high_write(&mut self, addr: u16, data: u8) {
        self.mapper.high_write(addr, data);
    }

    pub fn chr_read(&self, addr: u16) -> u8 {
        self.mapper.chr_read(addr)
    }

    pub fn chr_write(&mut self, addr: u16, data: u8) {
        self.mapper.chr_write(addr, data);
    }

    pub fn sync_cpu(&mut self) {
        self.mapper.sync_cpu();
    }

    pub fn sync_ppu(&mut self, ppu_cycle: u32, ppu_addr: u16) {
        self.mapper.sync_ppu(ppu_cycle, ppu_addr);
    }

    pub fn irq_asserted(&self) -> bool {
        self.mapper.irq_asserted()
    }

    pub fn audio_amplitude(&mut self) -> i16 {
        self.mapper.audio_amplitude()
    }
}

impl Clone for Cartridge {
    fn clone(&self) -> Self {
        Self {
            header: self.header,
            mapper: dyn_clone::clone_box(&*self.mapper),
        }
    }
}

/// Load a cartridge from an in-memory byte slice.
pub fn load_cartridge(bytes: &[u8]) -> Result<Cartridge, Error> {
    let header_bytes = bytes.get(..NES_HEADER_LEN).ok_or(Error::TooShort {
        actual: bytes.len(),
    })?;
    let header = Header::parse(header_bytes)?;
    let (trainer, prg_rom, chr_rom) = slice_sections(bytes, &header)?;

    let mapper: Box<dyn Mapper> = match header.mapper {
        5 => Box::new(Mapper5::new(header, prg_rom, chr_rom, trainer)?),
        id => return Err(Error::UnsupportedMapper(id)),
    };

    tracing::debug!(
        mapper = header.mapper,
        prg_rom = header.prg_rom_size,
        chr_rom = header.chr_rom_size,
        "cartridge loaded"
    );

    Ok(Cartridge::new(header, mapper))
}

/// Load a cartridge directly from disk.
pub fn load_cartridge_from_file<P>(path: P) -> Result<Cartridge, Error>
where
    P: AsRef<Path>,
{
    let bytes = fs::read(path)?;
    load_cartridge(&bytes)
}

fn slice_sections(
    bytes: &[u8],
    header: &Header,
) -> Result<(Option<Box<[u8; TRAINER_SIZE]>>, Box<[u8]>, Box<[u8]>), Error> {
    let mut cursor = NES_HEADER_LEN;
    let trainer = if header.trainer_present {
        let trainer_slice = section(bytes, &mut cursor, TRAINER_SIZE, "trainer")?;
        Some(
            trainer_slice
                .into_boxed_slice()
                .try_into()
                .expect("trainer length mismatch"),
        )
    } else {
        None
    };

    let prg_rom = section(bytes, &mut cursor, header.prg_rom_size, "PRG ROM")?;
    let chr_rom = section(bytes, &mut cursor, header.chr_rom_size, "CHR ROM")?;

    Ok((
        trainer,
        prg_rom.into_boxed_slice(),
        chr_rom.into_boxed_slice(),
    ))
}

fn section(
    bytes: &[u8],
    cursor: &mut usize,
    len: usize,
    name: &'static str,
) -> Result<Vec<u8>, Error> {
    if len == 0 {
        return Ok(Vec::new());
    }

    let end = cursor.checked_add(len).ok_or(Error::SectionTooShort {
        section: name,
        expected: len,
        actual: bytes.len().saturating_sub(*cursor),
    })?;

    let slice = bytes.get(*cursor..end).ok_or(Error::SectionTooShort {
        section: name,
        expected: len,
        actual: bytes.len().saturating_sub(*cursor),
    })?;

    *cursor = end;
    Ok(slice.to_vec())
}
