use std::collections::BTreeMap;

use crate::processor::alu::REGISTER_COUNT;
use crate::processor::status::StatusFlags;

/// The complete observable state of an [`Engine`](crate::Engine) at the end of a cycle.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Snapshot {
    pub memory: BTreeMap<u16, u16>,
    pub instruction_counter: u16,
    pub instruction_register: u16,
    pub data_bus: u16,
    pub address_bus: u16,
    /// Sequencer stack, bottom first.
    pub stack: Vec<u16>,
    pub micro_status: StatusFlags,
    pub macro_status: StatusFlags,
    pub accumulator: u16,
    pub registers: [u16; REGISTER_COUNT],
    pub micro_address: u16,
    pub cycles: u64
}
impl Snapshot {
    pub fn register(&self, index: usize) -> u16 {
        self.registers[index]
    }

    pub fn memory_value(&self, address: u16) -> u16 {
        self.memory.get(&address).copied().unwrap_or(0)
    }
}
