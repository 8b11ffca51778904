use std::{borrow::Cow, fmt::Debug};

use dyn_clone::DynClone;

use crate::reset_kind::ResetKind;

pub mod registers;

mod mapper5;
pub use mapper5::Mapper5;

/// Where a PPU nametable access should be routed.
///
/// The mapper decides per quadrant whether console-internal CIRAM or
/// mapper-owned RAM (ExRAM, fill mode) backs a nametable. The returned offset
/// is the address within the selected backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NametableTarget {
    /// Console CIRAM, offset within the 2 KiB internal VRAM.
    Ciram(u16),
    /// Mapper-owned VRAM; resolved through `mapper_nametable_read/write`.
    MapperVram(u16),
}

/// Observer events produced by a mapper for debugger front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperEvent {
    /// The scanline counter raised the interrupt line (rising edge only).
    ScanlineIrq { scanline: u8 },
}

/// Cartridge-hardware interface between the console cores and a mapper.
///
/// Address dispatch follows the board wiring: `low_*` covers `$4020-$7FFF`
/// (mapper registers, ExRAM, the SRAM window), `high_*` covers the
/// bankswitched `$8000-$FFFF` PRG space, and `chr_*` the PPU pattern tables.
/// `debug_read` is the side-effect-free register view for debugger UIs.
pub trait Mapper: DynClone + Debug {
    fn reset(&mut self, kind: ResetKind);

    fn low_read(&mut self, addr: u16) -> u8;

    fn low_write(&mut self, addr: u16, data: u8);

    /// Pure register read-back: the raw byte last written to a register, with
    /// none of the side effects `low_read` has.
    fn debug_read(&self, addr: u16) -> u8;

    fn high_read(&self, addr: u16) -> u8;

    fn high_write(&mut self, addr: u16, data: u8);

    /// One CPU cycle: drives the expansion audio channel sequencers.
    fn sync_cpu(&mut self);

    /// PPU cycle notification; drives CHR fetch-context switching and the
    /// scanline interrupt counter.
    fn sync_ppu(&mut self, ppu_cycle: u32, ppu_addr: u16);

    fn chr_read(&self, addr: u16) -> u8;

    fn chr_write(&mut self, addr: u16, data: u8);

    fn map_nametable(&self, addr: u16) -> NametableTarget;

    fn mapper_nametable_read(&self, offset: u16) -> u8;

    fn mapper_nametable_write(&mut self, offset: u16, data: u8);

    /// Level of the shared IRQ line, polled by the CPU core once per
    /// instruction boundary.
    fn irq_asserted(&self) -> bool;

    /// Mixes and drains the accumulated channel DAC samples into one audio
    /// frame amplitude.
    fn audio_amplitude(&mut self) -> i16;

    /// Host-side channel enable mask (bit 0/1 squares, bit 2 DMC); cleared
    /// bits mute the channel without stopping its sequencer.
    fn set_channel_mask(&mut self, mask: u8);

    /// Takes all debugger events recorded since the previous drain.
    fn drain_events(&mut self) -> Vec<MapperEvent>;

    fn mapper_id(&self) -> u16;

    fn name(&self) -> Cow<'static, str>;
}

dyn_clone::clone_trait_object!(Mapper);
