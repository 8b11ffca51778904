//! Length counter shared by the square channels.

use super::tables::LENGTH_TABLE;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct LengthCounter {
    value: u8,
    halt: bool,
}

impl LengthCounter {
    pub(super) fn clear(&mut self) {
        self.value = 0;
    }

    pub(super) fn active(&self) -> bool {
        self.value > 0
    }

    /// Loads from the 5-bit length select; ignored while the channel is
    /// disabled, matching hardware.
    pub(super) fn load(&mut self, index: u8, enabled: bool) {
        if enabled {
            self.value = LENGTH_TABLE[(index & 0x1F) as usize];
        }
    }

    pub(super) fn set_halt(&mut self, halt: bool) {
        self.halt = halt;
    }

    pub(super) fn clock(&mut self) {
        if self.value > 0 && !self.halt {
            self.value -= 1;
        }
    }
}
