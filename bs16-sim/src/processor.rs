macro_rules! bit_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident : $bitmask:literal >> $shift:literal {
        $($(#[$v_meta:meta])* $v_name:ident = $val:literal => $mnemonic:literal,)*
    }) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$v_meta])* $v_name = $val,)*
        }
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$v_name,)*];

            /// Extracts the field from `val`; `None` if the bits match no variant.
            pub fn decode(val: u32) -> Option<$name> {
                match (val & $bitmask) >> $shift {
                    $(x if x == $name::$v_name as u32 => Some($name::$v_name),)*
                    _ => None,
                }
            }

            /// Places the variant back at its position inside the field.
            pub fn encode(self) -> u32 {
                (self as u32) << $shift
            }

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $($name::$v_name => $mnemonic,)*
                }
            }

            pub fn from_mnemonic(mnemonic: &str) -> Option<$name> {
                match mnemonic {
                    $($mnemonic => Some($name::$v_name),)*
                    _ => None,
                }
            }
        }
    }
}

pub mod alu;
pub mod microcode;
pub mod sequencer;
pub mod status;
pub mod store;

use crate::bus::{Bus16, InstructionRegister};
use crate::error::{SimulationError, SimulationErrorKind, SimulationResult};
use crate::memory::Memory;
use crate::snapshot::Snapshot;
use crate::trace::{NoTrace, Trace};

use self::alu::{ArithmeticLogicUnit, REGISTER_COUNT};
use self::microcode::{IcControl, MicroInstruction, MicroWord, YMux};
use self::sequencer::ControlUnit;
use self::status::{StatusFlags, StatusUnit};
use self::store::{ControlStore, MappingProm};

/// Number of microcycles after which a run is abandoned.
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CycleOutcome {
    Executed,
    Halted
}

/// How a run ended, along with the state at that point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunOutcome {
    Halted(Snapshot),
    StepLimitExceeded(Snapshot)
}
impl RunOutcome {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            RunOutcome::Halted(snapshot) | RunOutcome::StepLimitExceeded(snapshot) => snapshot
        }
    }

    pub fn into_snapshot(self) -> Snapshot {
        match self {
            RunOutcome::Halted(snapshot) | RunOutcome::StepLimitExceeded(snapshot) => snapshot
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, RunOutcome::Halted(_))
    }
}

/// The whole machine: datapath, sequencer, status unit, memory and the two injected tables.
///
/// Errors are fatal: nothing past the failing step of the cycle is applied and the engine keeps
/// its state for inspection with [`Engine::snapshot`].
pub struct Engine {
    address_bus: Bus16,
    data_bus: Bus16,
    instruction_register: InstructionRegister,
    instruction_counter: u16,
    memory: Memory,
    control_store: ControlStore,
    mapping_prom: MappingProm,
    alu: ArithmeticLogicUnit,
    status_unit: StatusUnit,
    control_unit: ControlUnit,
    step_limit: u64,
    cycles: u64,
    last_program_address: Option<u16>
}
impl Engine {
    pub fn new(control_store: ControlStore, mapping_prom: MappingProm) -> Self {
        Engine {
            address_bus: Bus16::new(),
            data_bus: Bus16::new(),
            instruction_register: InstructionRegister::new(),
            instruction_counter: 0,
            memory: Memory::new(),
            control_store,
            mapping_prom,
            alu: ArithmeticLogicUnit::new(),
            status_unit: StatusUnit::new(),
            control_unit: ControlUnit::new(),
            step_limit: DEFAULT_STEP_LIMIT,
            cycles: 0,
            last_program_address: None
        }
    }

    pub fn with_step_limit(mut self, step_limit: u64) -> Self {
        self.step_limit = step_limit;
        self
    }

    /// Writes `program` at address 0 onwards, keeping any other memory contents.
    pub fn load_program(&mut self, program: &[u16]) -> SimulationResult<()> {
        if program.len() > 0x10000 {
            return Err(SimulationError::with_detail(
                SimulationErrorKind::OutOfRange,
                format!("program of {} words does not fit in memory", program.len())
            ));
        }
        for (address, &word) in program.iter().enumerate() {
            self.memory.write(address as u16, word);
        }
        self.last_program_address = program.len().checked_sub(1).map(|last| last as u16);
        Ok(())
    }

    /// Replaces the whole memory contents, forgetting any program loaded before.
    pub fn load_memory<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (u16, u16)>
    {
        self.memory.load(cells);
        self.last_program_address = None;
    }

    pub fn set_memory_value(&mut self, address: u16, value: u16) {
        self.memory.write(address, value);
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
        self.last_program_address = None;
    }

    pub fn load_registers(&mut self, registers: [u16; REGISTER_COUNT]) {
        self.alu.load_registers(registers);
    }

    pub fn set_accumulator(&mut self, value: u16) {
        self.alu.set_accumulator(value);
    }

    pub fn preset_macro_status(&mut self, status: StatusFlags) {
        self.status_unit.preset_macro_status(status);
    }

    pub fn preset_micro_status(&mut self, status: StatusFlags) {
        self.status_unit.preset_micro_status(status);
    }

    pub fn micro_address(&self) -> u16 {
        self.control_unit.micro_address()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn step_limit(&self) -> u64 {
        self.step_limit
    }

    pub fn last_program_address(&self) -> Option<u16> {
        self.last_program_address
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn control_store(&self) -> &ControlStore {
        &self.control_store
    }

    pub fn mapping_prom(&self) -> &MappingProm {
        &self.mapping_prom
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            memory: self.memory.cells().clone(),
            instruction_counter: self.instruction_counter,
            instruction_register: self.instruction_register.read(),
            data_bus: self.data_bus.read(),
            address_bus: self.address_bus.read(),
            stack: self.control_unit.stack().as_slice().to_vec(),
            micro_status: self.status_unit.micro_status(),
            macro_status: self.status_unit.macro_status(),
            accumulator: self.alu.accumulator(),
            registers: *self.alu.registers(),
            micro_address: self.control_unit.micro_address(),
            cycles: self.cycles
        }
    }

    /// Executes exactly one microcycle.
    pub fn cycle(&mut self) -> SimulationResult<CycleOutcome> {
        self.step(&mut NoTrace)
    }

    pub fn run(&mut self) -> SimulationResult<RunOutcome> {
        self.run_traced(&mut NoTrace)
    }

    /// Cycles until the halt word is fetched or the step limit is used up.
    pub fn run_traced<T>(&mut self, trace: &mut T) -> SimulationResult<RunOutcome>
    where
        T: Trace + ?Sized
    {
        for _ in 0..self.step_limit {
            if self.step(trace)? == CycleOutcome::Halted {
                trace.halted(self);
                return Ok(RunOutcome::Halted(self.snapshot()));
            }
        }
        Ok(RunOutcome::StepLimitExceeded(self.snapshot()))
    }

    fn step<T>(&mut self, trace: &mut T) -> SimulationResult<CycleOutcome>
    where
        T: Trace + ?Sized
    {
        let mic = self.control_unit.micro_address();
        let instruction = match self.control_store.fetch(mic).map_err(|e| e.at(mic))? {
            MicroWord::Halt => return Ok(CycleOutcome::Halted),
            MicroWord::Instruction(instruction) => instruction
        };

        trace.before_cycle(self, mic, &instruction);
        self.execute(&instruction).map_err(|e| e.at(mic))?;
        self.cycles += 1;
        trace.after_cycle(self, mic);

        Ok(CycleOutcome::Executed)
    }

    fn execute(&mut self, instruction: &MicroInstruction) -> SimulationResult<()> {
        let ic = IcControl::decode(u32::from(instruction.ic()))
            .ok_or_else(|| SimulationError::with_detail(
                SimulationErrorKind::MalformedIcField,
                format!("{:#06b}", instruction.ic())
            ))?;
        match ic {
            IcControl::AddressFromCounter => self.address_bus.write(self.instruction_counter),
            IcControl::Increment => self.instruction_counter = self.instruction_counter.wrapping_add(1),
            IcControl::DataFromCounter => self.data_bus.write(self.instruction_counter),
            IcControl::None | IcControl::LoadFromData => {}
        }

        let a = if instruction.a_mux() { instruction.ra_addr() } else { self.instruction_register.reg_a() };
        let b = if instruction.b_mux() { instruction.rb_addr() } else { self.instruction_register.reg_b() };
        let d = if instruction.k_mux() { instruction.constant() } else { self.data_bus.read() };
        let (y, flags) = self.alu.execute(instruction.alu_instruction(), a, b, d, self.status_unit.carry_in())?;

        let y_mux = YMux::decode(u32::from(instruction.y_mux()))
            .ok_or(SimulationErrorKind::OutOfRange)?;
        if y_mux.drives_address() {
            self.address_bus.write(y);
        }
        if y_mux.drives_data() {
            self.data_bus.write(y);
        }

        if ic == IcControl::LoadFromData {
            self.instruction_counter = self.data_bus.read();
        }
        if instruction.ir() {
            self.instruction_register.load(self.data_bus.read());
        }

        let condition = self.status_unit.evaluate_and_latch(
            flags,
            instruction.sr_macro(),
            instruction.sr_micro(),
            instruction.sscu_instruction()
        )?;

        let mapped_address = self.mapping_prom.resolve(self.instruction_register.opcode())?;
        self.control_unit.step(
            instruction.controller_instruction(),
            instruction.bar(),
            instruction.ccen(),
            condition,
            mapped_address
        )?;

        let address = self.address_bus.read();
        if instruction.mwe() {
            self.memory.write(address, self.data_bus.read());
        } else {
            self.data_bus.write(self.memory.read(address));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    use super::*;
    use super::alu::{AluDestination, AluFunction, AluSource};
    use super::microcode::{MicroInstructionBuilder, HALT_SENTINEL};
    use super::sequencer::ControllerInstruction;
    use super::status::{ConditionTest, StatusSelect};

    fn word() -> MicroInstructionBuilder {
        MicroInstruction::builder()
    }

    /// Fetch prologue at 0..=2, MOV-immediate at 0x010, a no-op at 0x020 and the halt word.
    fn small_machine() -> Engine {
        let store = ControlStore::from_words(vec![
            (0x000, word().ic(IcControl::AddressFromCounter).controller(ControllerInstruction::Cont).raw()),
            (0x001, word().load_ir().ic(IcControl::Increment).controller(ControllerInstruction::Cont).raw()),
            (0x002, word().controller(ControllerInstruction::Jmap).raw()),
            (0x010, word().ic(IcControl::AddressFromCounter).controller(ControllerInstruction::Cont).raw()),
            (0x011, word()
                .ic(IcControl::Increment)
                .alu(AluSource::Dz, AluFunction::Or, AluDestination::Ramf)
                .controller(ControllerInstruction::Reset)
                .raw()),
            (0x020, word().raw()),
            (0xFFF, HALT_SENTINEL)
        ]).unwrap();
        let prom = MappingProm::from_entries(vec![(0x02, 0x010), (0x12, 0x020), (0xFF, 0xFFF)]).unwrap();
        Engine::new(store, prom)
    }

    fn single_word(raw: u128) -> Engine {
        let store = ControlStore::from_words(vec![(0x000, raw)]).unwrap();
        Engine::new(store, MappingProm::new())
    }

    #[test]
    fn moves_an_immediate_and_halts() {
        let mut engine = small_machine();
        engine.load_program(&[0x0203, 0x002A, 0xFF00]).unwrap();

        let outcome = engine.run().unwrap();
        assert!(outcome.is_halted());

        let snapshot = outcome.snapshot();
        assert_eq!(snapshot.register(3), 0x2A);
        assert_eq!(snapshot.instruction_counter, 3);
        assert_eq!(snapshot.instruction_register, 0xFF00);
        assert_eq!(snapshot.micro_address, 0xFFF);
        assert_eq!(snapshot.cycles, 8);
        assert_eq!(engine.last_program_address(), Some(2));
    }

    #[test]
    fn prologue_loads_the_instruction_register() {
        let mut engine = small_machine();
        engine.load_program(&[0x1200, 0xFF00]).unwrap();

        assert_eq!(engine.cycle().unwrap(), CycleOutcome::Executed);
        assert_eq!(engine.snapshot().address_bus, 0);
        assert_eq!(engine.snapshot().data_bus, 0x1200);

        engine.cycle().unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.instruction_register, 0x1200);
        assert_eq!(snapshot.instruction_counter, 1);
        assert_eq!(snapshot.micro_address, 2);

        engine.cycle().unwrap();
        assert_eq!(engine.micro_address(), 0x020);
    }

    #[test]
    fn halt_does_not_count_as_a_cycle() {
        let mut engine = single_word(HALT_SENTINEL);
        assert_eq!(engine.cycle().unwrap(), CycleOutcome::Halted);
        assert_eq!(engine.cycles(), 0);
    }

    #[test]
    fn malformed_ic_freezes_the_state() {
        let raw = word().set(microcode::Field::Ic, 0b0011).unwrap()
            .alu(AluSource::Dz, AluFunction::Or, AluDestination::Ramf)
            .constant(7)
            .raw();
        let mut engine = single_word(raw);
        let before = engine.snapshot();

        let error = engine.run().unwrap_err();
        assert_eq!(error.kind(), SimulationErrorKind::MalformedIcField);
        assert_eq!(error.micro_address(), Some(0));
        assert_eq!(error.detail(), Some("0b0011"));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn dangling_micro_address_is_fatal() {
        let mut engine = single_word(word().controller(ControllerInstruction::Cont).raw());
        engine.cycle().unwrap();

        let error = engine.cycle().unwrap_err();
        assert_eq!(error.kind(), SimulationErrorKind::UnmappedMicroAddress);
        assert_eq!(error.micro_address(), Some(1));
        assert_eq!(engine.cycles(), 1);
    }

    #[test]
    fn unmapped_opcode_stops_at_the_prologue() {
        let mut engine = small_machine();
        engine.load_program(&[0x1312, 0xFF00]).unwrap();

        let error = engine.run().unwrap_err();
        assert_eq!(error.kind(), SimulationErrorKind::UnmappedMacroOpcode);
        assert_eq!(error.micro_address(), Some(1));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.cycles, 1);
        assert_eq!(snapshot.instruction_register, 0x1312);
        assert_eq!(snapshot.micro_address, 1);
    }

    #[test]
    fn step_limit_is_not_an_error() {
        let mut engine = single_word(word().controller(ControllerInstruction::Reset).raw())
            .with_step_limit(100);

        match engine.run().unwrap() {
            RunOutcome::StepLimitExceeded(snapshot) => assert_eq!(snapshot.cycles, 100),
            RunOutcome::Halted(_) => panic!("the loop never reaches a halt word")
        }
    }

    #[test]
    fn counter_is_loaded_before_the_memory_stage() {
        // PC takes the value Y drove onto the data bus, not the word read back from memory.
        let raw = word()
            .alu(AluSource::Dz, AluFunction::Or, AluDestination::Nop)
            .constant(0x0123)
            .y_mux(YMux::Data)
            .ic(IcControl::LoadFromData)
            .controller(ControllerInstruction::Reset)
            .raw();
        let mut engine = single_word(raw);
        engine.set_memory_value(0, 0xBEEF);

        engine.cycle().unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.instruction_counter, 0x0123);
        assert_eq!(snapshot.data_bus, 0xBEEF);
    }

    #[test]
    fn counter_reaches_the_alu_through_the_data_bus() {
        let store = ControlStore::from_words(vec![
            (0x000, word().ic(IcControl::Increment).controller(ControllerInstruction::Cont).raw()),
            (0x001, word()
                .ic(IcControl::DataFromCounter)
                .alu(AluSource::Dz, AluFunction::Or, AluDestination::Ramf)
                .rb(4)
                .controller(ControllerInstruction::Reset)
                .raw())
        ]).unwrap();
        let mut engine = Engine::new(store, MappingProm::new());

        engine.cycle().unwrap();
        engine.cycle().unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.register(4), 1);
        assert_eq!(snapshot.instruction_counter, 1);
        assert_eq!(snapshot.micro_address, 0);
    }

    #[test]
    fn writes_memory_when_enabled() {
        let raw = word()
            .alu(AluSource::Zb, AluFunction::Or, AluDestination::Nop)
            .rb(1)
            .y_mux(YMux::Both)
            .mwe()
            .controller(ControllerInstruction::Reset)
            .raw();
        let mut engine = single_word(raw);
        let mut registers = [0; REGISTER_COUNT];
        registers[1] = 0x0040;
        engine.load_registers(registers);

        engine.cycle().unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.memory_value(0x0040), 0x0040);
        assert_eq!(snapshot.address_bus, 0x0040);
        assert_eq!(snapshot.data_bus, 0x0040);
    }

    #[test]
    fn loading_memory_forgets_the_program() {
        let mut engine = small_machine();
        engine.load_program(&[0x0203, 0x002A, 0xFF00]).unwrap();
        assert_eq!(engine.last_program_address(), Some(2));

        engine.load_memory(vec![(0x0001, 0x1234)]);
        assert_eq!(engine.last_program_address(), None);
        assert_eq!(engine.memory().read(0x0000), 0);
        assert_eq!(engine.memory().read(0x0001), 0x1234);

        engine.load_program(&[0xFF00]).unwrap();
        assert_eq!(engine.last_program_address(), Some(0));
        assert_eq!(engine.memory().read(0x0001), 0x1234);
    }

    #[test]
    fn macro_status_drives_conditional_jumps() {
        // CJP falls through while Z is clear and jumps once it is set.
        let raw = word()
            .ccen()
            .status_select(StatusSelect::Macro)
            .condition_test(ConditionTest::Zero)
            .controller(ControllerInstruction::Cjp)
            .bar(0x100)
            .raw();
        let store = ControlStore::from_words(vec![
            (0x000, raw),
            (0x001, raw),
            (0x100, word().raw())
        ]).unwrap();
        let mut engine = Engine::new(store, MappingProm::new());

        engine.cycle().unwrap();
        assert_eq!(engine.micro_address(), 1);

        engine.preset_macro_status(StatusFlags::ZERO);
        engine.cycle().unwrap();
        assert_eq!(engine.micro_address(), 0x100);
    }

    #[test]
    fn micro_status_feeds_carry_in() {
        let raw = word()
            .alu(AluSource::Dz, AluFunction::Add, AluDestination::Ramf)
            .rb(0)
            .constant(1)
            .controller(ControllerInstruction::Reset)
            .raw();
        let mut engine = single_word(raw);
        engine.preset_micro_status(StatusFlags::CARRY);

        engine.cycle().unwrap();
        assert_eq!(engine.snapshot().register(0), 2);
    }

    #[test]
    fn runs_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let mut registers = [0; REGISTER_COUNT];
        for register in registers.iter_mut() {
            *register = rng.gen();
        }
        let accumulator: u16 = rng.gen();
        let program: Vec<u16> = (0..8).map(|_| 0x0200 | rng.gen_range(0..16u16))
            .flat_map(|op| vec![op, 0x1234])
            .chain(Some(0xFF00))
            .collect();

        let run = || {
            let mut engine = small_machine();
            engine.load_registers(registers);
            engine.set_accumulator(accumulator);
            engine.load_program(&program).unwrap();
            engine.run().unwrap()
        };

        let first = run();
        assert!(first.is_halted());
        assert_eq!(first, run());
    }

    #[test]
    fn bit_enum_mnemonics() {
        assert_eq!(ControllerInstruction::from_mnemonic("crtn"), Some(ControllerInstruction::Crtn));
        assert_eq!(ControllerInstruction::Cjpp.mnemonic(), "cjpp");
        assert_eq!(AluFunction::ALL.len(), 8);
        assert_eq!(StatusSelect::from_mnemonic("both"), None);
        for &ic in IcControl::ALL {
            assert_eq!(IcControl::decode(ic.encode()), Some(ic));
        }
    }
}
