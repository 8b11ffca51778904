//! CPU interrupt line modelling.
//!
//! The 6502's IRQ input is level-triggered and shared: any source can hold
//! the line low, and the line stays asserted until every source releases it.
//! The mapper owns one of these lines and the CPU core polls
//! [`IrqLine::is_asserted`] once per instruction boundary.

bitflags::bitflags! {
    /// Devices that can drive the shared IRQ line.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct IrqSource: u8 {
        /// Cartridge mapper (scanline counter and friends).
        const MAPPER = 0b0000_0001;
        /// On-cartridge audio (DMC sample-end interrupt).
        const AUDIO = 0b0000_0010;
    }
}

/// Level latch for the shared IRQ line.
///
/// Asserting and releasing are idempotent per source; re-asserting an already
/// held line is a no-op, matching real hardware where the line simply stays
/// low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IrqLine {
    asserted: IrqSource,
}

impl IrqLine {
    pub fn new() -> Self {
        Self {
            asserted: IrqSource::empty(),
        }
    }

    /// Holds the line for `source`. Returns `true` only on the rising edge,
    /// so callers can emit debug events without flooding.
    pub fn assert(&mut self, source: IrqSource) -> bool {
        let rising = !self.asserted.intersects(source);
        self.asserted.insert(source);
        rising
    }

    /// Releases the line for `source`. Other sources keep it asserted.
    pub fn release(&mut self, source: IrqSource) {
        self.asserted.remove(source);
    }

    pub fn is_asserted(&self) -> bool {
        !self.asserted.is_empty()
    }

    pub fn is_asserted_by(&self, source: IrqSource) -> bool {
        self.asserted.intersects(source)
    }
}
