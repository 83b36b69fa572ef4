use bs16_asm::{AssemblyResult, Microprogram};
use bs16_sim::Engine;

/// Microprogram implementing the bs16 macro instruction set. Used when no other one is given.
pub const REFERENCE_MICROCODE: &str = include_str!("../microcode/reference.ucode");

pub fn reference_microprogram() -> AssemblyResult<Microprogram> {
    Microprogram::parse(REFERENCE_MICROCODE)
}

/// An engine running `microprogram` for at most `step_limit` cycles.
pub fn engine(microprogram: Microprogram, step_limit: u64) -> Engine {
    Engine::new(microprogram.control_store, microprogram.mapping_prom)
        .with_step_limit(step_limit)
}

#[cfg(test)]
mod tests {
    use bs16_asm::Assembly;
    use bs16_sim::{RunOutcome, SimulationErrorKind, Snapshot};

    use super::*;

    fn run(source: &str) -> RunOutcome {
        let assembly = Assembly::assemble(source).unwrap();
        let mut engine = engine(reference_microprogram().unwrap(), 100_000);
        engine.load_memory(assembly.memory.clone());
        engine.load_program(&assembly.program).unwrap();
        engine.run().unwrap()
    }

    fn halted(source: &str) -> Snapshot {
        match run(source) {
            RunOutcome::Halted(snapshot) => snapshot,
            RunOutcome::StepLimitExceeded(_) => panic!("`{}` did not halt", source)
        }
    }

    #[test]
    fn reference_microprogram_is_consistent() {
        let microprogram = reference_microprogram().unwrap();
        let issues = microprogram.control_store.validate(&microprogram.mapping_prom);
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn moves_an_immediate() {
        let snapshot = halted("mov 5 r0\nwtf");
        assert_eq!(snapshot.register(0), 5);
        assert_eq!(snapshot.micro_address, 0xFFF);
        assert_eq!(snapshot.instruction_register, 0xFF00);
        assert_eq!(snapshot.cycles, 13);
    }

    #[test]
    fn sums_a_countdown() {
        let source = "
            mov 0 r0
            mov 5 r1
            mov 1 r2
            mov 100 r3
            add r1 r0       ; @8
            sub r2 r1
            jz 14
            jmp 8
            mov r0 [r3]     ; @14
        ";
        let snapshot = halted(source);
        assert_eq!(snapshot.register(0), 15);
        assert_eq!(snapshot.register(1), 0);
        assert_eq!(snapshot.memory_value(100), 15);
    }

    #[test]
    fn loads_and_stores() {
        let source = "
            mov 0x40 r3
            mov [r3] r4
            add r4 r4
            mov 0x41 r5
            mov r4 [r5]
            memory:
            0x40: 0x2a
        ";
        let snapshot = halted(source);
        assert_eq!(snapshot.register(4), 84);
        assert_eq!(snapshot.memory_value(0x41), 84);
        assert_eq!(snapshot.memory_value(0x40), 42);
    }

    #[test]
    fn jumps_when_lower() {
        let source = "
            mov 3 r1
            mov 7 r2
            cmp r2 r1
            jl 10
            mov 1 r5
            wtf
            mov 2 r6        ; @10
        ";
        let snapshot = halted(source);
        assert_eq!(snapshot.register(5), 0);
        assert_eq!(snapshot.register(6), 2);
    }

    #[test]
    fn jumps_through_a_register() {
        let source = "
            mov 5 r1
            mov 5 r2
            mov 12 r3
            cmp r1 r2
            jle r3
            mov 1 r5
            wtf
            wtf
            mov 2 r6        ; @12
        ";
        let snapshot = halted(source);
        assert_eq!(snapshot.register(5), 0);
        assert_eq!(snapshot.register(6), 2);
    }

    #[test]
    fn xors_registers() {
        let snapshot = halted("mov 0b1100 r1\nmov 0b1010 r2\nxor r1 r2");
        assert_eq!(snapshot.register(1), 0b1100);
        assert_eq!(snapshot.register(2), 0b0110);
    }

    #[test]
    fn unmapped_opcode_is_fatal() {
        let assembly = Assembly::assemble("upp r1 r2").unwrap();
        let mut engine = engine(reference_microprogram().unwrap(), 1000);
        engine.load_program(&assembly.program).unwrap();

        let error = engine.run().unwrap_err();
        assert_eq!(error.kind(), SimulationErrorKind::UnmappedMacroOpcode);
        assert_eq!(error.micro_address(), Some(1));
        assert_eq!(engine.cycles(), 1);
    }

    #[test]
    fn endless_loops_hit_the_step_limit() {
        let assembly = Assembly::assemble("jmp 0").unwrap();
        let mut engine = engine(reference_microprogram().unwrap(), 1000);
        engine.load_program(&assembly.program).unwrap();

        match engine.run().unwrap() {
            RunOutcome::StepLimitExceeded(snapshot) => assert_eq!(snapshot.cycles, 1000),
            RunOutcome::Halted(_) => panic!("`jmp 0` halted")
        }
    }

    #[test]
    fn runs_are_repeatable() {
        let source = "mov 0 r0\nmov 3 r1\nmov 1 r2\nadd r1 r0\nsub r2 r1\njz 14\njmp 6\nmov 9 r9";
        assert_eq!(run(source), run(source));
    }
}
