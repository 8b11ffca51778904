//! Descriptive register catalog for debugger front ends.
//!
//! The mapper core never consults this table; it exists so a UI can label the
//! 44 read-back bytes and decode their bitfields without re-encoding the
//! hardware layout itself.

/// One named bit range inside a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldInfo {
    pub name: &'static str,
    /// Least significant bit of the field.
    pub lsb: u8,
    /// Width in bits.
    pub width: u8,
}

/// Catalog entry for one mapper register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    pub addr: u16,
    pub name: &'static str,
    pub fields: &'static [BitfieldInfo],
}

const fn field(name: &'static str, lsb: u8, width: u8) -> BitfieldInfo {
    BitfieldInfo { name, lsb, width }
}

const SQUARE_CONTROL_FIELDS: &[BitfieldInfo] = &[
    field("Duty Cycle", 6, 2),
    field("Channel State", 5, 1),
    field("Envelope Disabled", 4, 1),
    field("Volume/Envelope", 0, 4),
];

const SQUARE_SWEEP_FIELDS: &[BitfieldInfo] = &[
    field("Sweep Enabled", 7, 1),
    field("Sweep Divider", 4, 3),
    field("Sweep Direction", 3, 1),
    field("Sweep Shift", 0, 3),
];

const SQUARE_PERIOD_LOW_FIELDS: &[BitfieldInfo] = &[field("Period Low-bits", 0, 8)];

const SQUARE_LENGTH_FIELDS: &[BitfieldInfo] =
    &[field("Length", 3, 5), field("Period High-bits", 0, 3)];

const DMC_CONTROL_FIELDS: &[BitfieldInfo] = &[
    field("IRQ Enabled", 7, 1),
    field("Loop", 6, 1),
    field("Period", 0, 4),
];

const DMC_DAC_FIELDS: &[BitfieldInfo] = &[field("Volume", 0, 8)];

const APU_CONTROL_FIELDS: &[BitfieldInfo] = &[
    field("Square2 Channel", 1, 1),
    field("Square1 Channel", 0, 1),
];

const PRG_MODE_FIELDS: &[BitfieldInfo] = &[field("PRG Mode", 0, 2)];
const CHR_MODE_FIELDS: &[BitfieldInfo] = &[field("CHR Mode", 0, 2)];
const PROTECT_A_FIELDS: &[BitfieldInfo] = &[field("PRG-RAM Protect A", 0, 2)];
const PROTECT_B_FIELDS: &[BitfieldInfo] = &[field("PRG-RAM Protect B", 0, 2)];
const EXRAM_MODE_FIELDS: &[BitfieldInfo] = &[field("EXRAM Mode", 0, 2)];

const NAMETABLE_FIELDS: &[BitfieldInfo] = &[
    field("$2000 mapping", 0, 2),
    field("$2400 mapping", 2, 2),
    field("$2800 mapping", 4, 2),
    field("$2C00 mapping", 6, 2),
];

const FILL_TILE_FIELDS: &[BitfieldInfo] = &[field("Fill Tile", 0, 8)];
const FILL_ATTR_FIELDS: &[BitfieldInfo] = &[field("Fill Attribute bits", 0, 2)];

const SRAM_BANK_FIELDS: &[BitfieldInfo] = &[field("$6000 mapping", 0, 3)];

const PRG_BANK_FIELDS: &[BitfieldInfo] =
    &[field("PRG mapping", 0, 7), field("ROM select", 7, 1)];
const PRG_BANK_ROM_ONLY_FIELDS: &[BitfieldInfo] = &[field("PRG mapping", 0, 7)];

const CHR_BANK_FIELDS: &[BitfieldInfo] = &[field("CHR mapping", 0, 8)];
const CHR_HIGH_FIELDS: &[BitfieldInfo] = &[field("CHR high bits", 0, 2)];

const SPLIT_CONTROL_FIELDS: &[BitfieldInfo] = &[
    field("Tile", 0, 5),
    field("Side", 6, 1),
    field("Enabled", 7, 1),
];
const SPLIT_SCROLL_FIELDS: &[BitfieldInfo] = &[field("Split Y scroll", 0, 8)];
const SPLIT_CHR_FIELDS: &[BitfieldInfo] = &[field("Split 4KB CHR page", 0, 8)];

const IRQ_TARGET_FIELDS: &[BitfieldInfo] = &[field("IRQ Target", 0, 8)];
const IRQ_CONTROL_FIELDS: &[BitfieldInfo] =
    &[field("In Frame", 6, 1), field("Enabled/Pending", 7, 1)];

const MULTIPLIER_LOW_FIELDS: &[BitfieldInfo] = &[field("Multiplicand & Result LSB", 0, 8)];
const MULTIPLIER_HIGH_FIELDS: &[BitfieldInfo] = &[field("Multiplier & Result MSB", 0, 8)];

/// All 44 mapper registers in read-back index order.
pub const REGISTERS: [RegisterInfo; 44] = [
    RegisterInfo { addr: 0x5000, name: "Square1 Control", fields: SQUARE_CONTROL_FIELDS },
    RegisterInfo { addr: 0x5001, name: "Square1 Sweep", fields: SQUARE_SWEEP_FIELDS },
    RegisterInfo { addr: 0x5002, name: "Square1 Period LSB", fields: SQUARE_PERIOD_LOW_FIELDS },
    RegisterInfo { addr: 0x5003, name: "Square1 Length", fields: SQUARE_LENGTH_FIELDS },
    RegisterInfo { addr: 0x5004, name: "Square2 Control", fields: SQUARE_CONTROL_FIELDS },
    RegisterInfo { addr: 0x5005, name: "Square2 Sweep", fields: SQUARE_SWEEP_FIELDS },
    RegisterInfo { addr: 0x5006, name: "Square2 Period LSB", fields: SQUARE_PERIOD_LOW_FIELDS },
    RegisterInfo { addr: 0x5007, name: "Square2 Length", fields: SQUARE_LENGTH_FIELDS },
    RegisterInfo { addr: 0x5010, name: "DMC Control", fields: DMC_CONTROL_FIELDS },
    RegisterInfo { addr: 0x5011, name: "DMC DAC", fields: DMC_DAC_FIELDS },
    RegisterInfo { addr: 0x5015, name: "APU Control", fields: APU_CONTROL_FIELDS },
    RegisterInfo { addr: 0x5100, name: "PRG Mode Select", fields: PRG_MODE_FIELDS },
    RegisterInfo { addr: 0x5101, name: "CHR Mode Select", fields: CHR_MODE_FIELDS },
    RegisterInfo { addr: 0x5102, name: "PRG-RAM Write Protect A", fields: PROTECT_A_FIELDS },
    RegisterInfo { addr: 0x5103, name: "PRG-RAM Write Protect B", fields: PROTECT_B_FIELDS },
    RegisterInfo { addr: 0x5104, name: "EXRAM Mode Select", fields: EXRAM_MODE_FIELDS },
    RegisterInfo { addr: 0x5105, name: "Mirroring Mode Select", fields: NAMETABLE_FIELDS },
    RegisterInfo { addr: 0x5106, name: "Fill Tile", fields: FILL_TILE_FIELDS },
    RegisterInfo { addr: 0x5107, name: "Fill Attribute", fields: FILL_ATTR_FIELDS },
    RegisterInfo { addr: 0x5113, name: "$6000 Control", fields: SRAM_BANK_FIELDS },
    RegisterInfo { addr: 0x5114, name: "PRG Control", fields: PRG_BANK_FIELDS },
    RegisterInfo { addr: 0x5115, name: "PRG Control", fields: PRG_BANK_FIELDS },
    RegisterInfo { addr: 0x5116, name: "PRG Control", fields: PRG_BANK_FIELDS },
    RegisterInfo { addr: 0x5117, name: "PRG Control", fields: PRG_BANK_ROM_ONLY_FIELDS },
    RegisterInfo { addr: 0x5120, name: "CHR A Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5121, name: "CHR A Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5122, name: "CHR A Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5123, name: "CHR A Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5124, name: "CHR A Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5125, name: "CHR A Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5126, name: "CHR A Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5127, name: "CHR A Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5128, name: "CHR B Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5129, name: "CHR B Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x512A, name: "CHR B Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x512B, name: "CHR B Control", fields: CHR_BANK_FIELDS },
    RegisterInfo { addr: 0x5130, name: "CHR High bits", fields: CHR_HIGH_FIELDS },
    RegisterInfo { addr: 0x5200, name: "Split Screen Control", fields: SPLIT_CONTROL_FIELDS },
    RegisterInfo { addr: 0x5201, name: "Split Screen Vert Scroll", fields: SPLIT_SCROLL_FIELDS },
    RegisterInfo { addr: 0x5202, name: "Split Screen CHR Page", fields: SPLIT_CHR_FIELDS },
    RegisterInfo { addr: 0x5203, name: "IRQ Trigger", fields: IRQ_TARGET_FIELDS },
    RegisterInfo { addr: 0x5204, name: "IRQ Control", fields: IRQ_CONTROL_FIELDS },
    RegisterInfo { addr: 0x5205, name: "8*8 Multiplier", fields: MULTIPLIER_LOW_FIELDS },
    RegisterInfo { addr: 0x5206, name: "8*8 Multiplier", fields: MULTIPLIER_HIGH_FIELDS },
];

/// Catalog entry for a register address, when it names one.
pub fn register_info(addr: u16) -> Option<&'static RegisterInfo> {
    REGISTERS.iter().find(|info| info.addr == addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::mapper5::register_index;

    #[test]
    fn catalog_order_matches_readback_indices() {
        for (index, info) in REGISTERS.iter().enumerate() {
            assert_eq!(register_index(info.addr), Some(index), "{:#06X}", info.addr);
        }
    }

    #[test]
    fn lookup_by_address() {
        let info = register_info(0x5203).expect("catalogued");
        assert_eq!(info.name, "IRQ Trigger");
        assert!(register_info(0x5108).is_none());
    }

    #[test]
    fn bitfields_stay_within_a_byte() {
        for info in &REGISTERS {
            for f in info.fields {
                assert!(f.lsb + f.width <= 8, "{} / {}", info.name, f.name);
            }
        }
    }
}
