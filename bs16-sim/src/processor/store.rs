use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::error::{SimulationError, SimulationErrorKind, SimulationResult};
use super::microcode::MicroWord;
use super::sequencer::ControllerInstruction;

/// Number of addressable control store words.
pub const MICRO_ADDRESS_SPACE: usize = 4096;
/// Opcode reserved for the halt instruction appended to every program.
pub const HALT_OPCODE: u8 = 0xFF;

fn check_micro_address(address: u16) -> SimulationResult<()> {
    if usize::from(address) >= MICRO_ADDRESS_SPACE {
        Err(SimulationError::with_detail(
            SimulationErrorKind::OutOfRange,
            format!("micro-address {:#X} is outside the control store", address)
        ))
    } else {
        Ok(())
    }
}

/// The microprogram, indexed by micro-address.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlStore {
    words: BTreeMap<u16, MicroWord>
}
impl ControlStore {
    pub fn new() -> Self {
        ControlStore {
            words: BTreeMap::new()
        }
    }

    pub fn from_words<I>(words: I) -> SimulationResult<Self>
    where
        I: IntoIterator<Item = (u16, u128)>
    {
        let mut store = ControlStore::new();
        for (address, raw) in words {
            store.insert(address, raw)?;
        }
        Ok(store)
    }

    /// Decodes `raw` and stores it at `address`, replacing any previous word.
    pub fn insert(&mut self, address: u16, raw: u128) -> SimulationResult<()> {
        check_micro_address(address)?;
        let word = MicroWord::decode(raw)?;
        self.words.insert(address, word);
        Ok(())
    }

    pub fn fetch(&self, address: u16) -> SimulationResult<MicroWord> {
        self.words.get(&address)
            .copied()
            .ok_or_else(|| SimulationError::with_detail(
                SimulationErrorKind::UnmappedMicroAddress,
                format!("{:#05X}", address)
            ))
    }

    pub fn contains(&self, address: u16) -> bool {
        self.words.contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, MicroWord)> + '_ {
        self.words.iter().map(|(&address, &word)| (address, word))
    }

    /// Looks for references that would make the engine fail at run time.
    ///
    /// The engine does not call this; dangling references only become errors when executed.
    pub fn validate(&self, prom: &MappingProm) -> Vec<StoreIssue> {
        let mut issues = Vec::new();

        if !self.contains(0) {
            issues.push(StoreIssue::MissingResetEntry);
        }

        match prom.get(HALT_OPCODE) {
            None => issues.push(StoreIssue::MissingHaltMapping),
            Some(address) => match self.words.get(&address) {
                Some(MicroWord::Halt) => {},
                _ => issues.push(StoreIssue::HaltMappingNotSentinel(address))
            }
        }

        for (opcode, address) in prom.iter() {
            if opcode != HALT_OPCODE && !self.contains(address) {
                issues.push(StoreIssue::DanglingPromEntry { opcode, address });
            }
        }

        for (address, word) in self.iter() {
            let instruction = match word {
                MicroWord::Instruction(instruction) => instruction,
                MicroWord::Halt => continue
            };
            let branches = match ControllerInstruction::decode(u32::from(instruction.controller_instruction())) {
                Some(ControllerInstruction::Cjs)
                | Some(ControllerInstruction::Cjp)
                | Some(ControllerInstruction::Push)
                | Some(ControllerInstruction::Cjpp) => true,
                _ => false
            };
            if branches && !self.contains(instruction.bar()) {
                issues.push(StoreIssue::DanglingBranch { address, target: instruction.bar() });
            }
        }

        issues
    }
}

/// A problem found by [`ControlStore::validate`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StoreIssue {
    MissingResetEntry,
    MissingHaltMapping,
    HaltMappingNotSentinel(u16),
    DanglingPromEntry { opcode: u8, address: u16 },
    DanglingBranch { address: u16, target: u16 }
}
impl Display for StoreIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            StoreIssue::MissingResetEntry => write!(f, "no microinstruction at reset address 0x000"),
            StoreIssue::MissingHaltMapping => write!(f, "opcode {:#04X} is not mapped", HALT_OPCODE),
            StoreIssue::HaltMappingNotSentinel(address) =>
                write!(f, "opcode {:#04X} maps to {:#05X}, which does not hold the halt word", HALT_OPCODE, address),
            StoreIssue::DanglingPromEntry { opcode, address } =>
                write!(f, "opcode {:#04X} maps to empty micro-address {:#05X}", opcode, address),
            StoreIssue::DanglingBranch { address, target } =>
                write!(f, "microinstruction at {:#05X} branches to empty micro-address {:#05X}", address, target)
        }
    }
}

/// Mapping PROM from macro opcodes to the entry point of their microcode.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MappingProm {
    entries: BTreeMap<u8, u16>
}
impl MappingProm {
    pub fn new() -> Self {
        MappingProm {
            entries: BTreeMap::new()
        }
    }

    pub fn from_entries<I>(entries: I) -> SimulationResult<Self>
    where
        I: IntoIterator<Item = (u8, u16)>
    {
        let mut prom = MappingProm::new();
        for (opcode, address) in entries {
            prom.insert(opcode, address)?;
        }
        Ok(prom)
    }

    pub fn insert(&mut self, opcode: u8, address: u16) -> SimulationResult<()> {
        check_micro_address(address)?;
        self.entries.insert(opcode, address);
        Ok(())
    }

    /// Resolves the JMAP target for `opcode`. Opcode 0 means "nothing loaded yet" and maps to 0.
    pub fn resolve(&self, opcode: u8) -> SimulationResult<u16> {
        if opcode == 0 {
            return Ok(0);
        }
        self.get(opcode)
            .ok_or_else(|| SimulationError::with_detail(
                SimulationErrorKind::UnmappedMacroOpcode,
                format!("{:#04X}", opcode)
            ))
    }

    pub fn get(&self, opcode: u8) -> Option<u16> {
        self.entries.get(&opcode).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        self.entries.iter().map(|(&opcode, &address)| (opcode, address))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
