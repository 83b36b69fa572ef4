/// A 16-bit bus latch.
///
/// The bus keeps the last value driven onto it until something else drives it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Bus16 {
    contents: u16
}
impl Bus16 {
    pub fn new() -> Self {
        Bus16 {
            contents: 0
        }
    }

    pub fn read(&self) -> u16 {
        self.contents
    }

    pub fn write(&mut self, v: u16) {
        self.contents = v
    }

    pub fn low8(&self) -> u8 {
        (self.contents & 0xFF) as u8
    }

    pub fn high8(&self) -> u8 {
        ((self.contents & 0xFF00) >> 8) as u8
    }
}

/// Instruction register, laid out as `opcode[15:8] | reg_a[7:4] | reg_b[3:0]`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct InstructionRegister {
    contents: Bus16
}
impl InstructionRegister {
    pub fn new() -> Self {
        InstructionRegister {
            contents: Bus16::new()
        }
    }

    pub fn load(&mut self, word: u16) {
        self.contents.write(word)
    }

    pub fn read(&self) -> u16 {
        self.contents.read()
    }

    pub fn opcode(&self) -> u8 {
        self.contents.high8()
    }

    pub fn reg_a(&self) -> u8 {
        (self.contents.low8() & 0xF0) >> 4
    }

    pub fn reg_b(&self) -> u8 {
        self.contents.low8() & 0x0F
    }
}
