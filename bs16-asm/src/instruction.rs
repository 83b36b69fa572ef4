use std::fmt::{Display, Formatter};

use crate::error::{AssemblyError, AssemblyErrorKind, AssemblyResult};
use crate::lexer::Token;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum Opcode {
    MovRegister = 0x01,
    MovConstant = 0x02,
    MovLoad = 0x03,
    MovStore = 0x04,
    Add = 0x05,
    Sub = 0x06,
    Cmp = 0x07,
    Xor = 0x08,
    Test = 0x09,
    JmpRegister = 0x0A,
    JmpConstant = 0x0B,
    JzRegister = 0x0C,
    JzConstant = 0x0D,
    JlRegister = 0x0E,
    JlConstant = 0x0F,
    JleRegister = 0x10,
    JleConstant = 0x11,
    Wtf = 0x12,
    Upp = 0x13,
    Halt = 0xFF
}
impl Opcode {
    pub const ALL: [Opcode; 20] = [
        Opcode::MovRegister,
        Opcode::MovConstant,
        Opcode::MovLoad,
        Opcode::MovStore,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Cmp,
        Opcode::Xor,
        Opcode::Test,
        Opcode::JmpRegister,
        Opcode::JmpConstant,
        Opcode::JzRegister,
        Opcode::JzConstant,
        Opcode::JlRegister,
        Opcode::JlConstant,
        Opcode::JleRegister,
        Opcode::JleConstant,
        Opcode::Wtf,
        Opcode::Upp,
        Opcode::Halt
    ];

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Opcode::ALL.iter()
            .copied()
            .find(|&opcode| opcode as u8 == byte)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::MovRegister | Opcode::MovConstant | Opcode::MovLoad | Opcode::MovStore => "mov",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Cmp => "cmp",
            Opcode::Xor => "xor",
            Opcode::Test => "test",
            Opcode::JmpRegister | Opcode::JmpConstant => "jmp",
            Opcode::JzRegister | Opcode::JzConstant => "jz",
            Opcode::JlRegister | Opcode::JlConstant => "jl",
            Opcode::JleRegister | Opcode::JleConstant => "jle",
            Opcode::Wtf => "wtf",
            Opcode::Upp => "upp",
            Opcode::Halt => "halt"
        }
    }

    /// Whether the instruction is followed by a literal word.
    pub fn has_literal(self) -> bool {
        matches!(
            self,
            Opcode::MovConstant | Opcode::JmpConstant | Opcode::JzConstant | Opcode::JlConstant | Opcode::JleConstant
        )
    }
}

/// A macro instruction: `opcode[15:8] | reg_a[7:4] | reg_b[3:0]`, plus the optional literal word.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub reg_a: u8,
    pub reg_b: u8,
    pub literal: Option<u16>
}
impl Instruction {
    pub fn new(opcode: Opcode, reg_a: u8, reg_b: u8) -> Self {
        Instruction { opcode, reg_a, reg_b, literal: None }
    }

    pub fn with_literal(opcode: Opcode, literal: u16) -> Self {
        Instruction { opcode, reg_a: 0, reg_b: 0, literal: Some(literal) }
    }

    pub fn halt() -> Self {
        Instruction::new(Opcode::Halt, 0, 0)
    }

    /// Parses a tokenized source line. The first token must be the mnemonic.
    pub fn parse(tokens: &[Token]) -> AssemblyResult<Instruction> {
        let (mnemonic, operands) = match tokens.split_first() {
            Some((Token::Word(mnemonic), operands)) => (mnemonic.as_str(), operands),
            _ => return Err(AssemblyError::from(AssemblyErrorKind::InvalidLine))
        };
        let invalid = || AssemblyError::with_description(
            AssemblyErrorKind::InvalidOperands,
            format!("`{}` does not take these operands", mnemonic)
        );

        let two_registers = |opcode: Opcode| match operands {
            [Token::Register(a), Token::Register(b)] => Ok(Instruction::new(opcode, *a, *b)),
            _ => Err(invalid())
        };
        let jump = |register: Opcode, constant: Opcode| match operands {
            [Token::Register(b)] => Ok(Instruction::new(register, 0, *b)),
            [Token::Constant(literal)] => Ok(Instruction::with_literal(constant, *literal)),
            _ => Err(invalid())
        };

        match mnemonic {
            "mov" => match operands {
                [Token::Register(a), Token::Register(b)] => Ok(Instruction::new(Opcode::MovRegister, *a, *b)),
                [Token::Constant(literal), Token::Register(b)] => Ok(Instruction {
                    opcode: Opcode::MovConstant,
                    reg_a: 0,
                    reg_b: *b,
                    literal: Some(*literal)
                }),
                [Token::Indirect(a), Token::Register(b)] => Ok(Instruction::new(Opcode::MovLoad, *a, *b)),
                [Token::Register(a), Token::Indirect(b)] => Ok(Instruction::new(Opcode::MovStore, *a, *b)),
                _ => Err(invalid())
            },
            "add" => two_registers(Opcode::Add),
            "sub" => two_registers(Opcode::Sub),
            "cmp" => two_registers(Opcode::Cmp),
            "xor" => two_registers(Opcode::Xor),
            "test" => two_registers(Opcode::Test),
            "upp" => two_registers(Opcode::Upp),
            "jmp" => jump(Opcode::JmpRegister, Opcode::JmpConstant),
            "jz" => jump(Opcode::JzRegister, Opcode::JzConstant),
            "jl" => jump(Opcode::JlRegister, Opcode::JlConstant),
            "jle" => jump(Opcode::JleRegister, Opcode::JleConstant),
            "wtf" if operands.is_empty() => Ok(Instruction::new(Opcode::Wtf, 0, 0)),
            "wtf" => Err(invalid()),
            _ => Err(AssemblyError::with_description(
                AssemblyErrorKind::UnknownMnemonic,
                format!("`{}`", mnemonic)
            ))
        }
    }

    pub fn word(&self) -> u16 {
        u16::from(self.opcode as u8) << 8 | u16::from(self.reg_a & 0xF) << 4 | u16::from(self.reg_b & 0xF)
    }

    /// The encoded instruction followed by its literal, if any.
    pub fn words(&self) -> Vec<u16> {
        let mut words = vec![self.word()];
        words.extend(self.literal);
        words
    }
}
impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mnemonic = self.opcode.mnemonic();
        match self.opcode {
            Opcode::MovConstant => write!(f, "{} {:#06x} r{}", mnemonic, self.literal.unwrap_or(0), self.reg_b),
            Opcode::MovLoad => write!(f, "{} [r{}] r{}", mnemonic, self.reg_a, self.reg_b),
            Opcode::MovStore => write!(f, "{} r{} [r{}]", mnemonic, self.reg_a, self.reg_b),
            Opcode::MovRegister | Opcode::Add | Opcode::Sub | Opcode::Cmp
            | Opcode::Xor | Opcode::Test | Opcode::Upp => write!(f, "{} r{} r{}", mnemonic, self.reg_a, self.reg_b),
            Opcode::JmpRegister | Opcode::JzRegister | Opcode::JlRegister | Opcode::JleRegister =>
                write!(f, "{} r{}", mnemonic, self.reg_b),
            Opcode::JmpConstant | Opcode::JzConstant | Opcode::JlConstant | Opcode::JleConstant =>
                write!(f, "{} {:#06x}", mnemonic, self.literal.unwrap_or(0)),
            Opcode::Wtf | Opcode::Halt => write!(f, "{}", mnemonic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn assemble(line: &str) -> AssemblyResult<Instruction> {
        Instruction::parse(&tokenize(line)?)
    }

    #[test]
    fn test_encodings() {
        let cases = [
            ("mov r1 r2", vec![0x0112]),
            ("mov 5 r0", vec![0x0200, 0x0005]),
            ("mov [r3] r4", vec![0x0334]),
            ("mov r4 [r5]", vec![0x0445]),
            ("add r1 r0", vec![0x0510]),
            ("sub r2 r1", vec![0x0621]),
            ("cmp r2 r1", vec![0x0721]),
            ("xor r15 r14", vec![0x08FE]),
            ("test r0 r0", vec![0x0900]),
            ("jmp r7", vec![0x0A07]),
            ("jmp 0x20", vec![0x0B00, 0x0020]),
            ("jz r1", vec![0x0C01]),
            ("jz 14", vec![0x0D00, 0x000E]),
            ("jl r2", vec![0x0E02]),
            ("jl 0b1010", vec![0x0F00, 0x000A]),
            ("jle r3", vec![0x1003]),
            ("jle 65535", vec![0x1100, 0xFFFF]),
            ("wtf", vec![0x1200]),
            ("upp r1 r2", vec![0x1312])
        ];
        for (line, words) in cases.iter() {
            assert_eq!(&assemble(line).unwrap().words(), words, "`{}`", line);
        }
        assert_eq!(Instruction::halt().word(), 0xFF00);
    }

    #[test]
    fn test_operand_errors() {
        for line in ["mov r1", "mov 5 6", "mov [r1] [r2]", "add 5 r1", "jmp [r1]", "jz", "wtf r1", "upp r1 r2 r3"].iter() {
            assert_eq!(assemble(line).unwrap_err().kind(), AssemblyErrorKind::InvalidOperands, "`{}`", line);
        }
    }

    #[test]
    fn test_unknown_mnemonic() {
        let error = assemble("mul r1 r2").unwrap_err();
        assert_eq!(error.kind(), AssemblyErrorKind::UnknownMnemonic);
        assert_eq!(assemble("5 r1").unwrap_err().kind(), AssemblyErrorKind::InvalidLine);
    }

    #[test]
    fn test_display() {
        assert_eq!(assemble("MOV 0x2A, r3").unwrap().to_string(), "mov 0x002a r3");
        assert_eq!(assemble("mov r4 [r5]").unwrap().to_string(), "mov r4 [r5]");
        assert_eq!(assemble("jle r3").unwrap().to_string(), "jle r3");
        assert_eq!(Opcode::from_byte(0x0F), Some(Opcode::JlConstant));
        assert_eq!(Opcode::from_byte(0x14), None);
    }
}
