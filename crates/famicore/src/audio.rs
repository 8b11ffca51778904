//! Non-linear amplitude mixing for the expansion audio channels.
//!
//! Once per audio frame the mapper drains each channel's DAC accumulator and
//! hands the sample runs to [`AmplitudeMixer::mix_frame`], which applies the
//! console's non-linear DAC combining formulas, averages across the frame,
//! and smooths the result with a fixed-point one-pole filter to suppress DC
//! stepping between frames.

/// Fixed-point one-pole smoothing coefficient: 0.9975 scaled to 16 bits.
const SMOOTHING_NUMERATOR: i32 = 65371;
const SMOOTHING_DENOMINATOR: i32 = 65536;

/// Output scaling: full 16-bit range at 50% headroom.
const OUTPUT_SCALE: f32 = 65535.0 * 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmplitudeMixer {
    last_out: i16,
}

impl AmplitudeMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_out = 0;
    }

    /// Mixes one audio frame's worth of DAC samples into a single smoothed
    /// 16-bit amplitude.
    ///
    /// `sq1` drives the frame's sample count; the other channels are read
    /// with bounds checks so a skewed accumulator can never index out of
    /// range. Channel terms with a zero sum are skipped entirely (the
    /// formulas divide by the channel sum).
    pub fn mix_frame(&mut self, sq1: &[u8], sq2: &[u8], dmc: &[u8]) -> i16 {
        let count = sq1.len();
        let mut accumulated: i32 = 0;

        for (index, &s1) in sq1.iter().enumerate() {
            let s2 = sq2.get(index).copied().unwrap_or(0);
            let d = dmc.get(index).copied().unwrap_or(0);
            accumulated += i32::from(mix_sample(s1, s2, d));
        }

        let averaged = if count == 0 {
            0
        } else {
            (accumulated as f32 / count as f32) as i32
        };

        let delta = averaged - i32::from(self.last_out);
        let smoothed = i32::from(self.last_out) + (delta * SMOOTHING_NUMERATOR) / SMOOTHING_DENOMINATOR;
        self.last_out = smoothed as i16;
        self.last_out
    }

    /// Last smoothed amplitude, without advancing the filter.
    pub fn last_output(&self) -> i16 {
        self.last_out
    }
}

/// Combines one set of per-cycle DAC levels with the console's non-linear
/// mixing formulas:
///
/// ```text
/// square_out = 95.88 / (8128 / (sq1 + sq2) + 100)
/// tnd_out    = 159.79 / (1 / (t/8227 + n/12241 + dmc/22638) + 100)
/// ```
///
/// Triangle and noise do not exist on this cartridge and contribute zero;
/// the term keeps its full three-channel shape so the formula itself stays
/// faithful to hardware.
fn mix_sample(sq1: u8, sq2: u8, dmc: u8) -> i16 {
    let square_sum = f32::from(sq1) + f32::from(sq2);
    let mut amplitude = 0.0f32;

    if square_sum != 0.0 {
        amplitude = 95.88 / ((8128.0 / square_sum) + 100.0);
    }

    if dmc != 0 {
        let triangle = 0.0f32;
        let noise = 0.0f32;
        let tnd_sum = triangle / 8227.0 + noise / 12241.0 + f32::from(dmc) / 22638.0;
        amplitude += 159.79 / ((1.0 / tnd_sum) + 100.0);
    }

    (OUTPUT_SCALE * amplitude) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_decays_monotonically_toward_zero() {
        let mut mixer = AmplitudeMixer::new();
        // Seed the filter with a loud frame.
        let loud = [15u8; 64];
        let first = mixer.mix_frame(&loud, &loud, &[0u8; 64]);
        assert!(first > 0);

        // Silent frames must decay through the one-pole filter, not snap to
        // zero immediately.
        let silent = [0u8; 64];
        let mut previous = first;
        for _ in 0..64 {
            let out = mixer.mix_frame(&silent, &silent, &silent);
            assert!(out <= previous);
            assert!(out >= 0);
            previous = out;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn empty_frame_is_treated_as_silence() {
        let mut mixer = AmplitudeMixer::new();
        assert_eq!(mixer.mix_frame(&[], &[], &[]), 0);
    }

    #[test]
    fn zero_channel_sums_skip_division() {
        // All-zero samples exercise the division guards; any panic here
        // would be a divide-by-zero style bug in the mix formula.
        assert_eq!(mix_sample(0, 0, 0), 0);
        assert!(mix_sample(15, 0, 0) > 0);
        assert!(mix_sample(0, 0, 64) > 0);
    }

    #[test]
    fn dmc_contribution_is_additive() {
        let squares_only = mix_sample(8, 8, 0);
        let with_dmc = mix_sample(8, 8, 64);
        assert!(with_dmc > squares_only);
    }

    #[test]
    fn mismatched_channel_lengths_are_bounds_checked() {
        let mut mixer = AmplitudeMixer::new();
        let long = [15u8; 32];
        let short = [15u8; 4];
        // Must not panic; short channels read as zero past their end.
        let out = mixer.mix_frame(&long, &short, &short[..2]);
        assert!(out > 0);
    }
}
