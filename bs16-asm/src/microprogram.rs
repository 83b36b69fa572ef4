use std::fs::File;
use std::io::Read;
use std::path::Path;

use bs16_sim::processor::alu::{AluDestination, AluFunction, AluSource};
use bs16_sim::processor::microcode::{Field, IcControl, MicroInstructionBuilder, YMux, HALT_SENTINEL};
use bs16_sim::processor::sequencer::ControllerInstruction;
use bs16_sim::processor::status::{ConditionTest, StatusSelect};
use bs16_sim::processor::store::{ControlStore, MappingProm};

use crate::error::{AssemblyError, AssemblyErrorKind, AssemblyResult};
use crate::lexer::parse_number;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Section {
    Prom,
    Microcode
}

/// A control store and its mapping PROM, read from a `.ucode` source.
///
/// ```text
/// prom:
///     0x02: 0x018         # mov const, rB
///     0xff: 0xfff
/// microcode:
///     0x000: ic=addr ctl=cont
///     0x018: ctl=cjs bar=0x0f0
///     0xfff: halt
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Microprogram {
    pub control_store: ControlStore,
    pub mapping_prom: MappingProm
}
impl Microprogram {
    pub fn from_file<P>(filename: P) -> AssemblyResult<Self>
    where
        P: AsRef<Path>
    {
        let mut file = File::open(filename.as_ref())?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Microprogram::parse(&contents)
    }

    pub fn parse(source: &str) -> AssemblyResult<Self> {
        let mut microprogram = Microprogram::default();
        let mut section = None;

        for (index, text) in source.lines().enumerate() {
            let line = strip_comment(text).trim().to_lowercase();
            if line.is_empty() {
                continue;
            }
            microprogram.parse_line(&line, &mut section)
                .map_err(|e| e.at_line(index + 1, text.trim()))?;
        }

        Ok(microprogram)
    }

    fn parse_line(&mut self, line: &str, section: &mut Option<Section>) -> AssemblyResult<()> {
        let (key, body) = match line.find(':') {
            Some(colon) => (line[..colon].trim(), line[colon + 1..].trim()),
            None => return Err(AssemblyError::with_description(AssemblyErrorKind::InvalidLine, "expected `<address>: <definition>`"))
        };

        if body.is_empty() && !key.starts_with(|c: char| c.is_ascii_digit()) {
            *section = Some(match key {
                "prom" => Section::Prom,
                "microcode" => Section::Microcode,
                _ => return Err(AssemblyError::with_description(AssemblyErrorKind::UnknownSection, format!("`{}`", key)))
            });
            return Ok(());
        }

        let address = parse_number(key)
            .ok_or_else(|| AssemblyError::with_description(AssemblyErrorKind::InvalidConstant, format!("`{}`", key)))?;
        match *section {
            None => Err(AssemblyError::from(AssemblyErrorKind::OutsideSection)),
            Some(Section::Prom) => self.define_mapping(address, body),
            Some(Section::Microcode) => self.define_word(address, body)
        }
    }

    fn define_mapping(&mut self, opcode: u128, body: &str) -> AssemblyResult<()> {
        if opcode > 0xFF {
            return Err(AssemblyError::with_description(
                AssemblyErrorKind::ConstantOutOfRange,
                format!("opcode {:#x} is wider than 8 bits", opcode)
            ));
        }
        let opcode = opcode as u8;
        if self.mapping_prom.get(opcode).is_some() {
            return Err(AssemblyError::with_description(
                AssemblyErrorKind::DuplicateAddress,
                format!("opcode {:#04x} is already mapped", opcode)
            ));
        }
        let address = parse_number(body)
            .filter(|&address| address <= u128::from(u16::MAX))
            .ok_or_else(|| AssemblyError::with_description(AssemblyErrorKind::InvalidConstant, format!("`{}`", body)))?;
        self.mapping_prom.insert(opcode, address as u16)
            .map_err(|e| AssemblyError::new(AssemblyErrorKind::FieldOutOfRange, e))
    }

    fn define_word(&mut self, address: u128, body: &str) -> AssemblyResult<()> {
        if address > u128::from(u16::MAX) {
            return Err(AssemblyError::with_description(
                AssemblyErrorKind::ConstantOutOfRange,
                format!("micro-address {:#x} is out of range", address)
            ));
        }
        let address = address as u16;
        if self.control_store.contains(address) {
            return Err(AssemblyError::with_description(
                AssemblyErrorKind::DuplicateAddress,
                format!("micro-address {:#05x} is already defined", address)
            ));
        }

        let raw = if body.is_empty() {
            return Err(AssemblyError::with_description(AssemblyErrorKind::InvalidLine, "missing microinstruction"));
        } else if body == "halt" {
            HALT_SENTINEL
        } else if body.starts_with(|c: char| c.is_ascii_digit()) {
            parse_number(body)
                .ok_or_else(|| AssemblyError::with_description(AssemblyErrorKind::InvalidConstant, format!("`{}`", body)))?
        } else {
            let mut builder = MicroInstructionBuilder::new();
            for assignment in body.split_whitespace() {
                builder = assign(builder, assignment)?;
            }
            builder.raw()
        };

        self.control_store.insert(address, raw)?;
        Ok(())
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find(|c: char| c == '#' || c == ';') {
        Some(start) => &line[..start],
        None => line
    }
}

fn symbol<T>(field: &str, value: &str, lookup: fn(&str) -> Option<T>) -> AssemblyResult<T> {
    lookup(value).ok_or_else(|| AssemblyError::with_description(
        AssemblyErrorKind::UnknownMnemonic,
        format!("`{}` is not a valid value for `{}`", value, field)
    ))
}

/// Resolves the short aliases of the canonical field names.
fn field_by_name(name: &str) -> Option<Field> {
    let canonical = match name {
        "ctl" => "controller_instruction",
        "sscu" => "sscu_instruction",
        "y" => "y_mux",
        "rb" => "rb_addr",
        "ra" => "ra_addr",
        "alu" => "alu_instruction",
        "k" => "k_mux",
        other => other
    };
    Field::from_name(canonical)
}

fn assign(builder: MicroInstructionBuilder, assignment: &str) -> AssemblyResult<MicroInstructionBuilder> {
    let (name, value) = match assignment.find('=') {
        Some(equals) => (&assignment[..equals], &assignment[equals + 1..]),
        None => return Err(AssemblyError::with_description(
            AssemblyErrorKind::InvalidLine,
            format!("expected `<field>=<value>`, found `{}`", assignment)
        ))
    };
    let numeric = value.starts_with(|c: char| c.is_ascii_digit());

    if !numeric {
        match name {
            "ctl" | "controller_instruction" =>
                return Ok(builder.controller(symbol(name, value, ControllerInstruction::from_mnemonic)?)),
            "ic" => return Ok(builder.ic(symbol(name, value, IcControl::from_mnemonic)?)),
            "y" | "y_mux" => return Ok(builder.y_mux(symbol(name, value, YMux::from_mnemonic)?)),
            _ => {}
        }
    }
    match name {
        "src" => Ok(builder.alu_source(symbol(name, value, AluSource::from_mnemonic)?)),
        "fn" => Ok(builder.alu_function(symbol(name, value, AluFunction::from_mnemonic)?)),
        "dst" => Ok(builder.alu_destination(symbol(name, value, AluDestination::from_mnemonic)?)),
        "sel" => Ok(builder.status_select(symbol(name, value, StatusSelect::from_mnemonic)?)),
        "test" => Ok(builder.condition_test(symbol(name, value, ConditionTest::from_mnemonic)?)),
        "latch" => match value {
            "macro" => Ok(builder.latch_macro()),
            "micro" => Ok(builder.latch_micro()),
            "both" => Ok(builder.latch_macro().latch_micro()),
            _ => symbol(name, value, |_| None)
        },
        _ => {
            let field = field_by_name(name)
                .ok_or_else(|| AssemblyError::with_description(AssemblyErrorKind::UnknownField, format!("`{}`", name)))?;
            let number = parse_number(value)
                .ok_or_else(|| AssemblyError::with_description(AssemblyErrorKind::InvalidConstant, format!("`{}`", value)))?;
            if number > u128::from(u32::MAX) {
                return Err(AssemblyError::with_description(
                    AssemblyErrorKind::FieldOutOfRange,
                    format!("{} does not fit in `{}`", value, field.name())
                ));
            }
            builder.set(field, number as u32)
                .map_err(|e| AssemblyError::new(AssemblyErrorKind::FieldOutOfRange, e))
        }
    }
}
