use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{AssemblyError, AssemblyErrorKind, AssemblyResult};
use crate::instruction::Instruction;
use crate::lexer::{normalize, parse_constant, tokenize};

/// Largest program that still fits in the 16-bit address space.
pub const MAX_PROGRAM_WORDS: usize = 0x10000;

/// One assembled source line.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ListingEntry {
    pub address: u16,
    pub line: Option<usize>,
    pub instruction: Instruction
}

/// The output of the assembler: program words starting at address 0 and the initial memory image.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Assembly {
    pub program: Vec<u16>,
    pub memory: BTreeMap<u16, u16>,
    pub listing: Vec<ListingEntry>
}
impl Assembly {
    pub fn from_file<P>(filename: P) -> AssemblyResult<Self>
    where
        P: AsRef<Path>
    {
        let mut file = File::open(filename.as_ref())?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Assembly::assemble(&contents)
    }

    /// Assembles `source`. A `memory:` line switches to `<address>:<value>` lines for the rest
    /// of the source. A halt instruction is always appended to the program.
    pub fn assemble(source: &str) -> AssemblyResult<Self> {
        let mut assembly = Assembly::default();
        let mut loading_memory = false;

        for (index, text) in source.lines().enumerate() {
            let line = normalize(text);
            if line.is_empty() {
                continue;
            }
            let result = if line == "memory:" {
                loading_memory = true;
                Ok(())
            } else if loading_memory {
                assembly.push_memory_line(&line)
            } else {
                assembly.push_instruction(&line, Some(index + 1))
            };
            result.map_err(|e| e.at_line(index + 1, text.trim()))?;
        }

        let halt = Instruction::halt();
        assembly.push(halt, None)?;
        Ok(assembly)
    }

    fn push_instruction(&mut self, line: &str, number: Option<usize>) -> AssemblyResult<()> {
        let instruction = Instruction::parse(&tokenize(line)?)?;
        self.push(instruction, number)
    }

    fn push(&mut self, instruction: Instruction, line: Option<usize>) -> AssemblyResult<()> {
        let words = instruction.words();
        if self.program.len() + words.len() > MAX_PROGRAM_WORDS {
            return Err(AssemblyError::from(AssemblyErrorKind::ProgramTooLarge));
        }
        self.listing.push(ListingEntry {
            address: self.program.len() as u16,
            line,
            instruction
        });
        self.program.extend(words);
        Ok(())
    }

    fn push_memory_line(&mut self, line: &str) -> AssemblyResult<()> {
        let invalid = || AssemblyError::with_description(
            AssemblyErrorKind::InvalidMemoryLine,
            "expected `<address>:<value>`"
        );
        let mut parts = line.split(':');
        let (address, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(address), Some(value), None) => (address.trim(), value.trim()),
            _ => return Err(invalid())
        };
        if address.is_empty() || value.is_empty() {
            return Err(invalid());
        }
        let address = parse_constant(address)?;
        let value = parse_constant(value)?;
        self.memory.insert(address, value);
        Ok(())
    }

    /// Address of the last program word.
    pub fn last_address(&self) -> Option<u16> {
        self.program.len().checked_sub(1).map(|address| address as u16)
    }

    /// The initial memory contents from address 0 up to the last used cell: the `memory:` cells
    /// with the program written over them, gaps filled with zeroes.
    pub fn image(&self) -> Vec<u16> {
        let memory_end = self.memory.keys()
            .next_back()
            .map_or(0, |&address| usize::from(address) + 1);
        let mut image = vec![0; memory_end.max(self.program.len())];
        for (&address, &value) in self.memory.iter() {
            image[usize::from(address)] = value;
        }
        image[..self.program.len()].copy_from_slice(&self.program);
        image
    }

    /// The memory image as big-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.image().iter()
            .flat_map(|word| word.to_be_bytes().to_vec())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_halt() {
        let assembly = Assembly::assemble("mov 5 r0\nwtf").unwrap();
        assert_eq!(assembly.program, vec![0x0200, 0x0005, 0x1200, 0xFF00]);
        assert!(assembly.memory.is_empty());
        assert_eq!(assembly.last_address(), Some(3));

        let empty = Assembly::assemble("").unwrap();
        assert_eq!(empty.program, vec![0xFF00]);
    }

    #[test]
    fn listing_tracks_addresses() {
        let assembly = Assembly::assemble("; sum\nmov 1 r0\n\nadd r0 r0\n").unwrap();
        let addresses: Vec<_> = assembly.listing.iter().map(|entry| (entry.address, entry.line)).collect();
        assert_eq!(addresses, vec![(0, Some(2)), (2, Some(4)), (3, None)]);
    }

    #[test]
    fn memory_section() {
        let source = "mov 0x40 r3\nMEMORY:\n0x40: 0x2a\n 65: 0b11 \n0x40:7";
        let assembly = Assembly::assemble(source).unwrap();
        assert_eq!(assembly.program, vec![0x0203, 0x0040, 0xFF00]);
        assert_eq!(assembly.memory.get(&0x40), Some(&7));
        assert_eq!(assembly.memory.get(&65), Some(&3));
    }

    #[test]
    fn instructions_after_memory_are_rejected() {
        let error = Assembly::assemble("memory:\n1:2\nmov r1 r2").unwrap_err();
        assert_eq!(error.kind(), AssemblyErrorKind::InvalidMemoryLine);
        assert_eq!(error.line(), Some(3));
        assert_eq!(error.text(), Some("mov r1 r2"));
    }

    #[test]
    fn memory_values_are_range_checked() {
        let error = Assembly::assemble("memory:\n0x10000:1").unwrap_err();
        assert_eq!(error.kind(), AssemblyErrorKind::ConstantOutOfRange);
        let error = Assembly::assemble("memory:\n5:x").unwrap_err();
        assert_eq!(error.kind(), AssemblyErrorKind::InvalidConstant);
    }

    #[test]
    fn errors_carry_the_line() {
        let error = Assembly::assemble("mov 1 r0\n  frob r1\n").unwrap_err();
        assert_eq!(error.kind(), AssemblyErrorKind::UnknownMnemonic);
        assert_eq!(error.line(), Some(2));
        assert_eq!(error.text(), Some("frob r1"));
    }

    #[test]
    fn big_endian_output() {
        let assembly = Assembly::assemble("wtf").unwrap();
        assert_eq!(assembly.to_bytes(), vec![0x12, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn image_keeps_the_memory_section() {
        let assembly = Assembly::assemble("wtf\nmemory:\n4: 0xBEEF\n0: 0x1111").unwrap();
        assert_eq!(assembly.image(), vec![0x1200, 0xFF00, 0x0000, 0x0000, 0xBEEF]);
        assert_eq!(
            assembly.to_bytes(),
            vec![0x12, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0xBE, 0xEF]
        );

        let short = Assembly::assemble("mov 1 r0\nmov 2 r1\nmemory:\n1: 7").unwrap();
        assert_eq!(short.image(), vec![0x0200, 0x0001, 0x0201, 0x0002, 0xFF00]);
    }
}
