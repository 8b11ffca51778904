//! Hardware lookup tables shared by the expansion audio channels.

/// Square duty sequences, indexed by duty select then sequencer step.
/// 12.5%, 25%, 50%, and 25% negated.
pub(super) const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Length counter reload values, indexed by the 5-bit length select.
pub(super) const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, //
    12, 16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// DMC bit period in CPU cycles, indexed by the 4-bit rate select (NTSC).
pub(super) const DMC_RATE_TABLE: [u16; 16] = [
    0x1AC, 0x17C, 0x154, 0x140, 0x11E, 0x0FE, 0x0E2, 0x0D6, //
    0x0BE, 0x0A0, 0x08E, 0x080, 0x06A, 0x054, 0x048, 0x036,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_sequences_have_expected_pulse_widths() {
        let widths: Vec<usize> = DUTY_TABLE
            .iter()
            .map(|seq| seq.iter().filter(|&&bit| bit != 0).count())
            .collect();
        assert_eq!(widths, vec![1, 2, 4, 6]);
    }

    #[test]
    fn dmc_rates_decrease_monotonically() {
        for pair in DMC_RATE_TABLE.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }
}
