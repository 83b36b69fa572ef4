use crate::error::{SimulationError, SimulationErrorKind, SimulationResult};
use super::alu::{AluDestination, AluFunction, AluSource};
use super::sequencer::ControllerInstruction;
use super::status::{ConditionTest, StatusSelect};

/// Width of a control word, in bits.
pub const WORD_WIDTH: u32 = 75;
/// The all-ones control word, reserved to stop the engine.
pub const HALT_SENTINEL: u128 = (1 << WORD_WIDTH) - 1;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Field {
    Mwe,
    Ir,
    Ic,
    Bar,
    ControllerInstruction,
    Ccen,
    SrMacro,
    SrMicro,
    SscuInstruction,
    YMux,
    BMux,
    RbAddr,
    AMux,
    RaAddr,
    AluInstruction,
    Constant,
    KMux
}
impl Field {
    pub const ALL: [Field; 17] = [
        Field::Mwe,
        Field::Ir,
        Field::Ic,
        Field::Bar,
        Field::ControllerInstruction,
        Field::Ccen,
        Field::SrMacro,
        Field::SrMicro,
        Field::SscuInstruction,
        Field::YMux,
        Field::BMux,
        Field::RbAddr,
        Field::AMux,
        Field::RaAddr,
        Field::AluInstruction,
        Field::Constant,
        Field::KMux
    ];

    pub fn offset(self) -> u32 {
        match self {
            Field::Mwe => 0,
            Field::Ir => 1,
            Field::Ic => 2,
            Field::Bar => 6,
            Field::ControllerInstruction => 18,
            Field::Ccen => 22,
            Field::SrMacro => 23,
            Field::SrMicro => 24,
            Field::SscuInstruction => 25,
            Field::YMux => 37,
            Field::BMux => 39,
            Field::RbAddr => 40,
            Field::AMux => 44,
            Field::RaAddr => 45,
            Field::AluInstruction => 49,
            Field::Constant => 58,
            Field::KMux => 74
        }
    }

    pub fn width(self) -> u32 {
        match self {
            Field::Mwe | Field::Ir | Field::Ccen | Field::SrMacro | Field::SrMicro
            | Field::BMux | Field::AMux | Field::KMux => 1,
            Field::YMux => 2,
            Field::Ic | Field::ControllerInstruction | Field::RbAddr | Field::RaAddr => 4,
            Field::AluInstruction => 9,
            Field::Bar | Field::SscuInstruction => 12,
            Field::Constant => 16
        }
    }

    pub fn mask(self) -> u32 {
        (1 << self.width()) - 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Mwe => "mwe",
            Field::Ir => "ir",
            Field::Ic => "ic",
            Field::Bar => "bar",
            Field::ControllerInstruction => "controller_instruction",
            Field::Ccen => "ccen",
            Field::SrMacro => "sr_macro",
            Field::SrMicro => "sr_micro",
            Field::SscuInstruction => "sscu_instruction",
            Field::YMux => "y_mux",
            Field::BMux => "b_mux",
            Field::RbAddr => "rb_addr",
            Field::AMux => "a_mux",
            Field::RaAddr => "ra_addr",
            Field::AluInstruction => "alu_instruction",
            Field::Constant => "constant",
            Field::KMux => "k_mux"
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter()
            .copied()
            .find(|field| field.name() == name)
    }
}

bit_enum! {
    /// Instruction counter control. At most one bit may be set.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
    pub enum IcControl : 0b1111 >> 0 {
        None                = 0b0000 => "none",
        AddressFromCounter  = 0b0001 => "addr",
        Increment           = 0b0010 => "inc",
        DataFromCounter     = 0b0100 => "data",
        LoadFromData        = 0b1000 => "load",
    }
}

bit_enum! {
    /// Routing of the ALU output onto the buses.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
    pub enum YMux : 0b11 >> 0 {
        None    = 0b00 => "none",
        Address = 0b01 => "addr",
        Data    = 0b10 => "data",
        Both    = 0b11 => "both",
    }
}
impl YMux {
    pub fn drives_address(self) -> bool {
        self.encode() & 0b01 != 0
    }

    pub fn drives_data(self) -> bool {
        self.encode() & 0b10 != 0
    }
}

/// A decoded 75-bit horizontal control word.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct MicroInstruction {
    raw: u128
}
impl MicroInstruction {
    pub fn new(raw: u128) -> SimulationResult<Self> {
        if raw >> WORD_WIDTH != 0 {
            Err(SimulationError::with_detail(
                SimulationErrorKind::OutOfRange,
                format!("control word {:#x} is wider than {} bits", raw, WORD_WIDTH)
            ))
        } else {
            Ok(MicroInstruction { raw })
        }
    }

    pub fn builder() -> MicroInstructionBuilder {
        MicroInstructionBuilder::new()
    }

    pub fn raw(&self) -> u128 {
        self.raw
    }

    pub fn field(&self, field: Field) -> u32 {
        ((self.raw >> field.offset()) as u32) & field.mask()
    }

    pub fn mwe(&self) -> bool {
        self.field(Field::Mwe) != 0
    }

    pub fn ir(&self) -> bool {
        self.field(Field::Ir) != 0
    }

    pub fn ic(&self) -> u8 {
        self.field(Field::Ic) as u8
    }

    pub fn bar(&self) -> u16 {
        self.field(Field::Bar) as u16
    }

    pub fn controller_instruction(&self) -> u8 {
        self.field(Field::ControllerInstruction) as u8
    }

    pub fn ccen(&self) -> bool {
        self.field(Field::Ccen) != 0
    }

    pub fn sr_macro(&self) -> bool {
        self.field(Field::SrMacro) != 0
    }

    pub fn sr_micro(&self) -> bool {
        self.field(Field::SrMicro) != 0
    }

    pub fn sscu_instruction(&self) -> u16 {
        self.field(Field::SscuInstruction) as u16
    }

    pub fn y_mux(&self) -> u8 {
        self.field(Field::YMux) as u8
    }

    pub fn b_mux(&self) -> bool {
        self.field(Field::BMux) != 0
    }

    pub fn rb_addr(&self) -> u8 {
        self.field(Field::RbAddr) as u8
    }

    pub fn a_mux(&self) -> bool {
        self.field(Field::AMux) != 0
    }

    pub fn ra_addr(&self) -> u8 {
        self.field(Field::RaAddr) as u8
    }

    pub fn alu_instruction(&self) -> u16 {
        self.field(Field::AluInstruction) as u16
    }

    pub fn constant(&self) -> u16 {
        self.field(Field::Constant) as u16
    }

    pub fn k_mux(&self) -> bool {
        self.field(Field::KMux) != 0
    }
}

/// A control store entry: either a real instruction or the halt sentinel.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum MicroWord {
    Instruction(MicroInstruction),
    Halt
}
impl MicroWord {
    pub fn decode(raw: u128) -> SimulationResult<Self> {
        if raw == HALT_SENTINEL {
            Ok(MicroWord::Halt)
        } else {
            MicroInstruction::new(raw).map(MicroWord::Instruction)
        }
    }

    pub fn raw(&self) -> u128 {
        match *self {
            MicroWord::Instruction(instruction) => instruction.raw(),
            MicroWord::Halt => HALT_SENTINEL
        }
    }
}

/// Assembles a control word field by field.
///
/// Every field starts at zero, which for the controller means `RESET`.
/// The typed setters silently truncate to the field width; `set` rejects values that do not fit.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct MicroInstructionBuilder {
    raw: u128
}
impl MicroInstructionBuilder {
    pub fn new() -> Self {
        MicroInstructionBuilder { raw: 0 }
    }

    pub fn set(self, field: Field, value: u32) -> SimulationResult<Self> {
        if value > field.mask() {
            Err(SimulationError::with_detail(
                SimulationErrorKind::OutOfRange,
                format!("{} does not fit in `{}` ({} bit(s))", value, field.name(), field.width())
            ))
        } else {
            Ok(self.put(field, value))
        }
    }

    fn put(self, field: Field, value: u32) -> Self {
        self.put_bits(field, field.mask(), value)
    }

    fn put_bits(mut self, field: Field, mask: u32, value: u32) -> Self {
        let mask = u128::from(mask & field.mask()) << field.offset();
        self.raw = (self.raw & !mask) | ((u128::from(value) << field.offset()) & mask);
        self
    }

    pub fn mwe(self) -> Self {
        self.put(Field::Mwe, 1)
    }

    pub fn load_ir(self) -> Self {
        self.put(Field::Ir, 1)
    }

    pub fn ic(self, ic: IcControl) -> Self {
        self.put(Field::Ic, ic.encode())
    }

    pub fn bar(self, address: u16) -> Self {
        self.put(Field::Bar, u32::from(address))
    }

    pub fn controller(self, instruction: ControllerInstruction) -> Self {
        self.put(Field::ControllerInstruction, instruction.encode())
    }

    pub fn ccen(self) -> Self {
        self.put(Field::Ccen, 1)
    }

    pub fn latch_macro(self) -> Self {
        self.put(Field::SrMacro, 1)
    }

    pub fn latch_micro(self) -> Self {
        self.put(Field::SrMicro, 1)
    }

    pub fn status_select(self, select: StatusSelect) -> Self {
        self.put_bits(Field::SscuInstruction, 0b1100_0000_0000, select.encode())
    }

    pub fn condition_test(self, test: ConditionTest) -> Self {
        self.put_bits(Field::SscuInstruction, 0b11_1111, test.encode())
    }

    pub fn y_mux(self, y_mux: YMux) -> Self {
        self.put(Field::YMux, y_mux.encode())
    }

    /// Takes operand A from `index` instead of the instruction register.
    pub fn ra(self, index: u8) -> Self {
        self.put(Field::AMux, 1).put(Field::RaAddr, u32::from(index))
    }

    /// Takes operand B from `index` instead of the instruction register.
    pub fn rb(self, index: u8) -> Self {
        self.put(Field::BMux, 1).put(Field::RbAddr, u32::from(index))
    }

    pub fn alu_source(self, source: AluSource) -> Self {
        self.put_bits(Field::AluInstruction, 0b000_000_111, source.encode())
    }

    pub fn alu_function(self, function: AluFunction) -> Self {
        self.put_bits(Field::AluInstruction, 0b000_111_000, function.encode())
    }

    pub fn alu_destination(self, destination: AluDestination) -> Self {
        self.put_bits(Field::AluInstruction, 0b111_000_000, destination.encode())
    }

    pub fn alu(self, source: AluSource, function: AluFunction, destination: AluDestination) -> Self {
        self.alu_source(source)
            .alu_function(function)
            .alu_destination(destination)
    }

    /// Feeds `value` to the ALU D operand instead of the data bus.
    pub fn constant(self, value: u16) -> Self {
        self.put(Field::KMux, 1).put(Field::Constant, u32::from(value))
    }

    pub fn raw(&self) -> u128 {
        self.raw
    }

    pub fn build(self) -> MicroInstruction {
        MicroInstruction { raw: self.raw }
    }
}
