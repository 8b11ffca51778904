//! Square channel: duty sequencer, envelope, sweep, and length counter.

use super::{
    DacBuffer,
    envelope::Envelope,
    length_counter::LengthCounter,
    tables::DUTY_TABLE,
};

/// CPU cycles per quarter-frame clock of the channel-internal sequencer.
///
/// The expansion channels are not wired to the console APU's frame counter;
/// each channel runs its own divider at the standard NTSC quarter-frame rate.
const QUARTER_FRAME_CYCLES: u16 = 7457;

/// Distinguishes the two squares for the sweep unit's negate adder: square 1
/// uses one's-complement subtraction, square 2 two's-complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SquareId {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Sweep {
    enabled: bool,
    negate: bool,
    shift: u8,
    period: u8,
    divider: u8,
    reload: bool,
    id: SquareId,
}

impl Sweep {
    fn new(id: SquareId) -> Self {
        Self {
            enabled: false,
            negate: false,
            shift: 0,
            period: 0,
            divider: 0,
            reload: false,
            id,
        }
    }

    pub(super) fn write(&mut self, value: u8) {
        self.enabled = value & 0b1000_0000 != 0;
        self.period = (value >> 4) & 0b0000_0111;
        self.negate = value & 0b0000_1000 != 0;
        self.shift = value & 0b0000_0111;
        self.reload = true;
    }

    fn muted(&self, timer_period: u16) -> bool {
        timer_period < 8 || self.target_period(timer_period) > 0x07FF
    }

    fn target_period(&self, timer_period: u16) -> u16 {
        let delta = timer_period >> self.shift;
        if self.negate {
            match self.id {
                SquareId::One => timer_period.wrapping_sub(delta).wrapping_sub(1),
                SquareId::Two => timer_period.wrapping_sub(delta),
            }
        } else {
            timer_period.wrapping_add(delta)
        }
    }

    fn clock(&mut self, timer_period: &mut u16) {
        let should_mutate = self.enabled && self.shift != 0 && !self.muted(*timer_period);

        if self.divider == 0 {
            if should_mutate {
                *timer_period = self.target_period(*timer_period);
            }
            self.divider = self.period;
        } else {
            self.divider -= 1;
        }

        if self.reload {
            self.reload = false;
            self.divider = self.period;
        }
    }
}

/// Channel-internal quarter/half-frame divider (4-step sequence).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
struct FrameDivider {
    counter: u16,
    step: u8,
}

impl FrameDivider {
    /// Advances one CPU cycle; returns `(quarter, half)` clocks when a frame
    /// step elapses.
    fn tick(&mut self) -> (bool, bool) {
        self.counter += 1;
        if self.counter < QUARTER_FRAME_CYCLES {
            return (false, false);
        }
        self.counter = 0;
        let half = self.step == 1 || self.step == 3;
        self.step = (self.step + 1) & 0b11;
        (true, half)
    }
}

/// MMC5 square channel.
///
/// Register layout matches the console pulse channels: control (duty,
/// halt/loop, envelope), sweep, timer low, and length/timer high.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Square {
    duty: u8,
    duty_pos: u8,
    timer: u16,
    timer_period: u16,
    phase_toggle: bool,
    envelope: Envelope,
    length: LengthCounter,
    sweep: Sweep,
    frame: FrameDivider,
    enabled: bool,
    muted: bool,
    dac: DacBuffer,
}

impl Square {
    pub fn new(id: SquareId) -> Self {
        Self {
            duty: 0,
            duty_pos: 0,
            timer: 0,
            timer_period: 0,
            phase_toggle: false,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            sweep: Sweep::new(id),
            frame: FrameDivider::default(),
            enabled: false,
            muted: false,
            dac: DacBuffer::new(),
        }
    }

    pub fn reset(&mut self) {
        let id = self.sweep.id;
        *self = Self::new(id);
    }

    /// Applies a write to one of the four channel registers.
    pub fn write_register(&mut self, index: usize, value: u8) {
        match index & 0b11 {
            0 => {
                self.duty = (value >> 6) & 0b0000_0011;
                self.envelope.configure(value);
                self.length.set_halt(self.envelope.halts_length());
            }
            1 => self.sweep.write(value),
            2 => self.timer_period = (self.timer_period & 0xFF00) | value as u16,
            _ => {
                self.timer_period =
                    (self.timer_period & 0x00FF) | (((value & 0b0000_0111) as u16) << 8);
                self.length.load(value >> 3, self.enabled);
                self.duty_pos = 0;
                self.phase_toggle = false;
                self.envelope.restart();
                self.timer = self.timer_period;
                self.sweep.reload = true;
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length.clear();
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Advances the channel by one CPU cycle and accumulates a DAC sample.
    pub fn tick(&mut self) {
        let (quarter, half) = self.frame.tick();
        if quarter {
            self.envelope.clock();
        }
        if half {
            self.length.clock();
            self.sweep.clock(&mut self.timer_period);
        }

        self.clock_timer();

        let sample = if self.muted { 0 } else { self.output() };
        self.dac.push(sample);
    }

    fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            // The duty sequencer advances every other timer reload (the
            // square timer runs at half the CPU clock).
            self.phase_toggle = !self.phase_toggle;
            if self.phase_toggle {
                self.duty_pos = (self.duty_pos + 1) & 0b111;
            }
        } else {
            self.timer -= 1;
        }
    }

    /// Current DAC level (0..=15).
    pub fn output(&self) -> u8 {
        if !self.enabled || !self.length.active() || self.sweep.muted(self.timer_period) {
            return 0;
        }

        if DUTY_TABLE[self.duty as usize][self.duty_pos as usize] == 0 {
            0
        } else {
            self.envelope.output()
        }
    }

    pub fn length_active(&self) -> bool {
        self.length.active()
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
