use std::ops::{BitOr, BitOrAssign};

use crate::error::{SimulationError, SimulationErrorKind, SimulationResult};

/// A 4-bit status field laid out as `OVR|C|N|Z`.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Debug)]
pub struct StatusFlags(u8);
impl StatusFlags {
    pub const ZERO: StatusFlags = StatusFlags(0b0001);
    pub const NEGATIVE: StatusFlags = StatusFlags(0b0010);
    pub const CARRY: StatusFlags = StatusFlags(0b0100);
    pub const OVERFLOW: StatusFlags = StatusFlags(0b1000);

    pub fn empty() -> Self {
        StatusFlags(0)
    }

    /// Bits above the lower nibble are dropped.
    pub fn from_bits(bits: u8) -> Self {
        StatusFlags(bits & 0b1111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: StatusFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn overflow(self) -> bool {
        self.contains(StatusFlags::OVERFLOW)
    }

    pub fn carry(self) -> bool {
        self.contains(StatusFlags::CARRY)
    }

    pub fn negative(self) -> bool {
        self.contains(StatusFlags::NEGATIVE)
    }

    pub fn zero(self) -> bool {
        self.contains(StatusFlags::ZERO)
    }
}
impl BitOr for StatusFlags {
    type Output = StatusFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        StatusFlags(self.0 | rhs.0)
    }
}
impl BitOrAssign for StatusFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

bit_enum! {
    /// Which status register the condition test reads. `0b11` is not wired.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
    pub enum StatusSelect : 0b1100_0000_0000 >> 10 {
        Disabled    = 0b00 => "none",
        Macro       = 0b01 => "macro",
        Micro       = 0b10 => "micro",
    }
}

bit_enum! {
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
    pub enum ConditionTest : 0b11_1111 >> 0 {
        NotZero             = 0b000100 => "nz",
        Zero                = 0b000101 => "z",
        NotCarry            = 0b001010 => "nc",
        Carry               = 0b001011 => "c",
        NotCarryNotZero     = 0b001100 => "ncnz",
        CarryOrZero         = 0b001101 => "cz",
    }
}
impl ConditionTest {
    pub fn evaluate(self, status: StatusFlags) -> bool {
        let (c, z) = (status.carry(), status.zero());
        match self {
            ConditionTest::NotZero => !z,
            ConditionTest::Zero => z,
            ConditionTest::NotCarry => !c,
            ConditionTest::Carry => c,
            ConditionTest::NotCarryNotZero => !c && !z,
            ConditionTest::CarryOrZero => c || z
        }
    }
}

/// Status and shift control unit: the micro and macro status registers plus the condition
/// code multiplexer.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct StatusUnit {
    micro_status: StatusFlags,
    macro_status: StatusFlags
}
impl StatusUnit {
    pub fn new() -> Self {
        StatusUnit {
            micro_status: StatusFlags::empty(),
            macro_status: StatusFlags::empty()
        }
    }

    pub fn micro_status(&self) -> StatusFlags {
        self.micro_status
    }

    pub fn macro_status(&self) -> StatusFlags {
        self.macro_status
    }

    pub fn preset_micro_status(&mut self, status: StatusFlags) {
        self.micro_status = status;
    }

    pub fn preset_macro_status(&mut self, status: StatusFlags) {
        self.macro_status = status;
    }

    pub fn carry_in(&self) -> bool {
        self.micro_status.carry()
    }

    /// Evaluates the condition selected by `instruction` and then latches `flags` into the
    /// enabled status registers. The condition always sees the status from before the latch.
    pub fn evaluate_and_latch(&mut self, flags: StatusFlags, ce_macro: bool, ce_micro: bool, instruction: u16) -> SimulationResult<bool> {
        let instruction = u32::from(instruction);
        let select = StatusSelect::decode(instruction)
            .ok_or_else(|| SimulationError::with_detail(
                SimulationErrorKind::IllegalStatusSelect,
                format!("{:#04b}", (instruction >> 10) & 0b11)
            ))?;

        let source = match select {
            StatusSelect::Disabled => None,
            StatusSelect::Macro => Some(self.macro_status),
            StatusSelect::Micro => Some(self.micro_status)
        };
        let condition = match (source, ConditionTest::decode(instruction)) {
            (Some(status), Some(test)) => test.evaluate(status),
            _ => false
        };

        if ce_macro {
            self.macro_status = flags;
        }
        if ce_micro {
            self.micro_status = flags;
        }

        Ok(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sscu(select: StatusSelect, test: ConditionTest) -> u16 {
        (select.encode() | test.encode()) as u16
    }

    #[test]
    fn condition_truth_table() {
        let cases = [
            (ConditionTest::NotZero, [true, false, true, false]),
            (ConditionTest::Zero, [false, true, false, true]),
            (ConditionTest::NotCarry, [true, true, false, false]),
            (ConditionTest::Carry, [false, false, true, true]),
            (ConditionTest::NotCarryNotZero, [true, false, false, false]),
            (ConditionTest::CarryOrZero, [false, true, true, true])
        ];
        let statuses = [
            StatusFlags::empty(),
            StatusFlags::ZERO,
            StatusFlags::CARRY,
            StatusFlags::CARRY | StatusFlags::ZERO
        ];
        for &(test, expected) in cases.iter() {
            for (status, &result) in statuses.iter().zip(expected.iter()) {
                assert_eq!(test.evaluate(*status), result, "{:?} on {:04b}", test, status.bits());
            }
        }
    }

    #[test]
    fn selects_source_register() {
        let mut unit = StatusUnit::new();
        unit.preset_macro_status(StatusFlags::ZERO);

        let from_macro = unit.evaluate_and_latch(StatusFlags::empty(), false, false, sscu(StatusSelect::Macro, ConditionTest::Zero)).unwrap();
        let from_micro = unit.evaluate_and_latch(StatusFlags::empty(), false, false, sscu(StatusSelect::Micro, ConditionTest::Zero)).unwrap();
        let disabled = unit.evaluate_and_latch(StatusFlags::empty(), false, false, sscu(StatusSelect::Disabled, ConditionTest::NotZero)).unwrap();

        assert!(from_macro);
        assert!(!from_micro);
        assert!(!disabled);
    }

    #[test]
    fn unknown_test_opcode_is_false() {
        let mut unit = StatusUnit::new();
        let condition = unit.evaluate_and_latch(StatusFlags::empty(), false, false, 0b0100_0011_1111).unwrap();
        assert!(!condition);
    }

    #[test]
    fn condition_reads_status_before_latch() {
        let mut unit = StatusUnit::new();
        let condition = unit.evaluate_and_latch(StatusFlags::ZERO, false, true, sscu(StatusSelect::Micro, ConditionTest::Zero)).unwrap();
        assert!(!condition);
        assert_eq!(unit.micro_status(), StatusFlags::ZERO);

        let condition = unit.evaluate_and_latch(StatusFlags::empty(), false, false, sscu(StatusSelect::Micro, ConditionTest::Zero)).unwrap();
        assert!(condition);
    }

    #[test]
    fn latches_are_independent() {
        let mut unit = StatusUnit::new();
        let flags = StatusFlags::OVERFLOW | StatusFlags::CARRY;

        unit.evaluate_and_latch(flags, true, false, 0).unwrap();
        assert_eq!(unit.macro_status(), flags);
        assert_eq!(unit.micro_status(), StatusFlags::empty());
        assert!(!unit.carry_in());

        unit.evaluate_and_latch(flags, false, true, 0).unwrap();
        assert_eq!(unit.micro_status(), flags);
        assert!(unit.carry_in());
    }

    #[test]
    fn select_0b11_is_illegal() {
        let mut unit = StatusUnit::new();
        for opcode in 0..64u16 {
            let error = unit.evaluate_and_latch(StatusFlags::ZERO, true, true, 0b1100_0000_0000 | opcode).unwrap_err();
            assert_eq!(error.kind(), SimulationErrorKind::IllegalStatusSelect);
        }
        assert_eq!(unit, StatusUnit::new());
    }
}
