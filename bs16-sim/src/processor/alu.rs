use crate::error::{SimulationError, SimulationErrorKind, SimulationResult};
use super::status::StatusFlags;

pub const REGISTER_COUNT: usize = 16;

bit_enum! {
    /// Operand pair `R`,`S` fed to the function unit.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
    pub enum AluSource : 0b000_000_111 >> 0 {
        Aq = 0b000 => "aq",
        Ab = 0b001 => "ab",
        Zq = 0b010 => "zq",
        Zb = 0b011 => "zb",
        Za = 0b100 => "za",
        Da = 0b101 => "da",
        Dq = 0b110 => "dq",
        Dz = 0b111 => "dz",
    }
}

bit_enum! {
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
    pub enum AluFunction : 0b000_111_000 >> 3 {
        Add     = 0b000 => "add",
        Subr    = 0b001 => "subr",
        Subs    = 0b010 => "subs",
        Or      = 0b011 => "or",
        And     = 0b100 => "and",
        NotRs   = 0b101 => "notrs",
        Exor    = 0b110 => "exor",
        Exnor   = 0b111 => "exnor",
    }
}

bit_enum! {
    /// Where the result goes. Only the lower half of the 3-bit field is wired.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
    pub enum AluDestination : 0b111_000_000 >> 6 {
        Nop     = 0b000 => "nop",
        Qreg    = 0b001 => "qreg",
        Rama    = 0b010 => "rama",
        Ramf    = 0b011 => "ramf",
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct AluInstruction {
    pub source: AluSource,
    pub function: AluFunction,
    pub destination: AluDestination
}
impl AluInstruction {
    pub fn decode(instruction: u16) -> SimulationResult<Self> {
        let instruction = u32::from(instruction);
        let destination = AluDestination::decode(instruction)
            .ok_or_else(|| SimulationError::with_detail(
                SimulationErrorKind::IllegalResultSelect,
                format!("{:#05b}", (instruction >> 6) & 0b111)
            ))?;
        // Both of these cover their whole 3-bit field.
        let source = AluSource::decode(instruction)
            .ok_or(SimulationErrorKind::OutOfRange)?;
        let function = AluFunction::decode(instruction)
            .ok_or(SimulationErrorKind::OutOfRange)?;

        Ok(AluInstruction { source, function, destination })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct RegisterFile {
    pub registers: [u16; REGISTER_COUNT],
    pub q: u16
}
impl RegisterFile {
    pub fn new() -> Self {
        RegisterFile {
            registers: [0; REGISTER_COUNT],
            q: 0x0000
        }
    }
}

/// The slice ALU together with its register file and Q register.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ArithmeticLogicUnit {
    register_file: RegisterFile
}
impl ArithmeticLogicUnit {
    pub fn new() -> Self {
        ArithmeticLogicUnit {
            register_file: RegisterFile::new()
        }
    }

    pub fn registers(&self) -> &[u16; REGISTER_COUNT] {
        &self.register_file.registers
    }

    pub fn accumulator(&self) -> u16 {
        self.register_file.q
    }

    pub fn load_registers(&mut self, registers: [u16; REGISTER_COUNT]) {
        self.register_file.registers = registers;
    }

    pub fn set_accumulator(&mut self, value: u16) {
        self.register_file.q = value;
    }

    /// Runs one ALU operation and returns the Y output with the computed flags.
    ///
    /// `a` and `b` index the register file, `d` is the direct data input.
    pub fn execute(&mut self, instruction: u16, a: u8, b: u8, d: u16, carry_in: bool) -> SimulationResult<(u16, StatusFlags)> {
        let AluInstruction { source, function, destination } = AluInstruction::decode(instruction)?;
        let a = usize::from(a & 0xF);
        let b = usize::from(b & 0xF);

        let reg_a = self.register_file.registers[a];
        let reg_b = self.register_file.registers[b];
        let q = self.register_file.q;

        let (r, s) = match source {
            AluSource::Aq => (reg_a, q),
            AluSource::Ab => (reg_a, reg_b),
            AluSource::Zq => (0, q),
            AluSource::Zb => (0, reg_b),
            AluSource::Za => (0, reg_a),
            AluSource::Da => (d, reg_a),
            AluSource::Dq => (d, q),
            AluSource::Dz => (d, 0)
        };
        let (r, s, c) = (i32::from(r), i32::from(s), i32::from(carry_in));

        let raw = match function {
            AluFunction::Add => r + s + c,
            AluFunction::Subr => s - r - c,
            AluFunction::Subs => r - s - c,
            AluFunction::Or => r | s,
            AluFunction::And => r & s,
            AluFunction::NotRs => (r ^ 0xFFFF) & s,
            AluFunction::Exor => r ^ s,
            AluFunction::Exnor => (r ^ s) ^ 0xFFFF
        };

        let overflow = raw > 0xFFFF || raw < 0;
        let negative = raw < 0;
        let result = (raw & 0xFFFF) as u16;

        let output = if destination == AluDestination::Rama { reg_a } else { result };
        match destination {
            AluDestination::Nop => {},
            AluDestination::Qreg => self.register_file.q = result,
            AluDestination::Rama | AluDestination::Ramf => self.register_file.registers[b] = result
        }

        let mut flags = StatusFlags::empty();
        if overflow {
            // OVR and C are driven by the same signal.
            flags |= StatusFlags::OVERFLOW | StatusFlags::CARRY;
        }
        if negative {
            flags |= StatusFlags::NEGATIVE;
        }
        if result == 0 {
            flags |= StatusFlags::ZERO;
        }

        Ok((output, flags))
    }
}
