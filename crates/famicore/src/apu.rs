//! Expansion audio channels carried on the cartridge.
//!
//! The MMC5 ships two square channels and a PCM/DMC channel behind the
//! mapper's low register window. Each channel is an independent state
//! machine ticked once per CPU cycle; they only meet in the amplitude mixer
//! (`crate::audio`), which drains the per-channel DAC accumulators once per
//! audio frame.

mod dmc;
mod envelope;
mod length_counter;
mod square;
mod tables;

pub use dmc::Dmc;
pub use square::{Square, SquareId};

/// Upper bound on buffered DAC samples between two amplitude computations.
///
/// The accumulator is drained once per audio frame; if the host stops calling
/// the mixer the buffer saturates instead of growing without bound, and the
/// oldest frame's shape is preserved.
const DAC_BUFFER_CAP: usize = 4096;

/// Per-cycle DAC sample accumulator with a running sample count.
///
/// Channels push one sample per CPU cycle; the mixer averages a frame's worth
/// and then clears the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DacBuffer {
    samples: Vec<u8>,
}

impl DacBuffer {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(DAC_BUFFER_CAP),
        }
    }

    pub fn push(&mut self, sample: u8) {
        if self.samples.len() < DAC_BUFFER_CAP {
            self.samples.push(sample);
        }
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Running sample count since the last clear.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
