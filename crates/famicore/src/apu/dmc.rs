//! DMC/PCM channel: direct DAC loads plus a DMA-style playback sequencer.
//!
//! The MMC5 exposes only a control register and a direct DAC load; sample
//! addressing lives in the external CPU core, which feeds fetched bytes into
//! [`Dmc::queue_sample`]. The shift-register playback path matches the
//! console DMC: one bit per timer expiry, ±2 DAC steps, silence when the
//! sample buffer runs dry.

use super::{DacBuffer, tables::DMC_RATE_TABLE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dmc {
    irq_enable: bool,
    looped: bool,
    rate_index: u8,
    timer: u16,
    timer_period: u16,
    output_level: u8,
    shift_register: u8,
    bits_remaining: u8,
    silence: bool,
    sample_buffer: Option<u8>,
    /// Last byte that entered the shift register, replayed in loop mode.
    last_sample: Option<u8>,
    irq_pending: bool,
    muted: bool,
    dac: DacBuffer,
}

impl Default for Dmc {
    fn default() -> Self {
        Self {
            irq_enable: false,
            looped: false,
            rate_index: 0,
            // Bit period is `DMC_RATE_TABLE[rate]` CPU cycles; the counter
            // reloads with period - 1.
            timer: DMC_RATE_TABLE[0] - 1,
            timer_period: DMC_RATE_TABLE[0] - 1,
            output_level: 0,
            shift_register: 0,
            // Hardware powers up with the bit counter at 8.
            bits_remaining: 8,
            silence: true,
            sample_buffer: None,
            last_sample: None,
            irq_pending: false,
            muted: false,
            dac: DacBuffer::new(),
        }
    }
}

impl Dmc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Applies a write to one of the two channel registers: 0 = control
    /// (IRQ enable, loop, rate select), 1 = direct 7-bit DAC load.
    pub fn write_register(&mut self, index: usize, value: u8) {
        match index & 0b1 {
            0 => {
                self.irq_enable = value & 0b1000_0000 != 0;
                if !self.irq_enable {
                    self.irq_pending = false;
                }
                self.looped = value & 0b0100_0000 != 0;
                self.rate_index = value & 0b0000_1111;
                self.timer_period = DMC_RATE_TABLE[self.rate_index as usize] - 1;
            }
            _ => self.output_level = value & 0b0111_1111,
        }
    }

    /// Supplies the next fetched sample byte (the external core performs the
    /// actual memory read / DMA stall).
    pub fn queue_sample(&mut self, byte: u8) {
        self.sample_buffer = Some(byte);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Sample-end interrupt latch; cleared by disabling IRQs via the control
    /// register.
    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Advances the channel by one CPU cycle and accumulates a DAC sample.
    pub fn tick(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.shift_output();
        } else {
            self.timer -= 1;
        }

        let sample = if self.muted { 0 } else { self.output_level };
        self.dac.push(sample);
    }

    /// Current DAC level (0..=127).
    pub fn output(&self) -> u8 {
        self.output_level
    }

    fn shift_output(&mut self) {
        if !self.silence {
            if self.shift_register & 1 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }

            self.shift_register >>= 1;
        }

        self.bits_remaining = self.bits_remaining.saturating_sub(1);
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            self.reload_shift_register();
        }
    }

    fn reload_shift_register(&mut self) {
        if let Some(sample) = self.sample_buffer.take() {
            self.shift_register = sample;
            self.last_sample = Some(sample);
            self.silence = false;
        } else if self.looped {
            if let Some(sample) = self.last_sample {
                self.shift_register = sample;
                self.silence = false;
            } else {
                self.silence = true;
            }
        } else {
            if !self.silence && self.irq_enable {
                self.irq_pending = true;
            }
            self.silence = true;
        }
    }

    pub fn dac_samples(&self) -> &[u8] {
        self.dac.samples()
    }

    pub fn dac_sample_count(&self) -> usize {
        self.dac.len()
    }

    pub fn clear_dac(&mut self) {
        self.dac.clear();
    }
}
