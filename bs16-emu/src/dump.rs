use std::fmt::Write;

use console::style;

use bs16_sim::Snapshot;
use bs16_sim::processor::alu::{AluDestination, AluFunction, AluSource};
use bs16_sim::processor::microcode::{Field, IcControl, MicroInstruction, YMux};
use bs16_sim::processor::sequencer::ControllerInstruction;
use bs16_sim::processor::status::{ConditionTest, StatusFlags, StatusSelect};

/// Which memory cells end up in a dump.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryFilter {
    /// Every non-zero cell.
    All,
    /// Non-zero cells past the end of the loaded program.
    AfterProgram(Option<u16>)
}
impl MemoryFilter {
    pub fn accepts(self, address: u16, value: u16) -> bool {
        if value == 0 {
            return false;
        }
        match self {
            MemoryFilter::All => true,
            MemoryFilter::AfterProgram(Some(last)) => address > last,
            MemoryFilter::AfterProgram(None) => true
        }
    }
}

fn hex_dec(value: u16) -> String {
    format!("{:#06X} ({})", value, value)
}

fn flags(status: StatusFlags) -> String {
    format!(
        "O={} C={} N={} Z={}",
        status.overflow() as u8,
        status.carry() as u8,
        status.negative() as u8,
        status.zero() as u8
    )
}

fn named<T>(value: Option<T>, mnemonic: fn(T) -> &'static str) -> &'static str {
    value.map(mnemonic).unwrap_or("?")
}

pub fn registers(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for (row, chunk) in snapshot.registers.chunks(4).enumerate() {
        let cells: Vec<_> = chunk.iter()
            .enumerate()
            .map(|(column, value)| format!("r{:02} {:#06X}", row * 4 + column, value))
            .collect();
        let _ = writeln!(out, "  {}", cells.join("   "));
    }
    let _ = writeln!(out, "  Q   {}", hex_dec(snapshot.accumulator));
    out
}

pub fn machine_state(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let stack: Vec<_> = snapshot.stack.iter().map(|address| format!("{:#05X}", address)).collect();
    let _ = writeln!(out, "  Micro status:         {}", flags(snapshot.micro_status));
    let _ = writeln!(out, "  Macro status:         {}", flags(snapshot.macro_status));
    let _ = writeln!(out, "  Micro-address:        {:#05X}", snapshot.micro_address);
    let _ = writeln!(out, "  Stack:                [{}]", stack.join(", "));
    let _ = writeln!(out, "  Instruction counter:  {}", hex_dec(snapshot.instruction_counter));
    let _ = writeln!(out, "  Instruction register: {}", hex_dec(snapshot.instruction_register));
    let _ = writeln!(out, "  Address bus:          {}", hex_dec(snapshot.address_bus));
    let _ = writeln!(out, "  Data bus:             {}", hex_dec(snapshot.data_bus));
    let _ = writeln!(out, "  Cycles:               {}", snapshot.cycles);
    out
}

pub fn memory(snapshot: &Snapshot, filter: MemoryFilter) -> String {
    let mut out = String::new();
    for (&address, &value) in snapshot.memory.iter() {
        if filter.accepts(address, value) {
            let _ = writeln!(out, "  {:<16} {}", hex_dec(address), hex_dec(value));
        }
    }
    out
}

/// The full state of the machine, as printed after a cycle or at the end of a run.
pub fn snapshot(snapshot: &Snapshot, filter: MemoryFilter) -> String {
    let memory = memory(snapshot, filter);
    format!(
        "{}\n{}{}\n{}{}\n{}",
        style("Registers").cyan().bright(),
        registers(snapshot),
        style("Control").cyan().bright(),
        machine_state(snapshot),
        style("Memory").cyan().bright(),
        if memory.is_empty() { String::from("  (empty)\n") } else { memory }
    )
}

/// The fields of a control word, with the mnemonic of every encoded selector.
pub fn micro_instruction(instruction: &MicroInstruction) -> String {
    let alu = u32::from(instruction.alu_instruction());
    let sscu = u32::from(instruction.sscu_instruction());
    let mut out = String::new();
    let _ = writeln!(out, "  raw                    {:#021X}", instruction.raw());
    for &field in Field::ALL.iter() {
        let value = instruction.field(field);
        let meaning = match field {
            Field::Ic => named(IcControl::decode(value), IcControl::mnemonic).to_owned(),
            Field::ControllerInstruction => named(ControllerInstruction::decode(value), ControllerInstruction::mnemonic).to_owned(),
            Field::YMux => named(YMux::decode(value), YMux::mnemonic).to_owned(),
            Field::SscuInstruction => format!(
                "sel={} test={}",
                named(StatusSelect::decode(sscu), StatusSelect::mnemonic),
                named(ConditionTest::decode(sscu), ConditionTest::mnemonic)
            ),
            Field::AluInstruction => format!(
                "src={} fn={} dst={}",
                named(AluSource::decode(alu), AluSource::mnemonic),
                named(AluFunction::decode(alu), AluFunction::mnemonic),
                named(AluDestination::decode(alu), AluDestination::mnemonic)
            ),
            _ => String::new()
        };
        let _ = writeln!(out, "  {:<22} {:#X} {}", field.name(), value, style(meaning).dim());
    }
    out
}
