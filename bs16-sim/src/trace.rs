use crate::processor::Engine;
use crate::processor::microcode::MicroInstruction;

/// Observer invoked around every microcycle.
///
/// Implementations only get shared access to the engine, so tracing can never alter a run.
pub trait Trace {
    fn before_cycle(&mut self, _engine: &Engine, _micro_address: u16, _instruction: &MicroInstruction) {}
    fn after_cycle(&mut self, _engine: &Engine, _micro_address: u16) {}
    fn halted(&mut self, _engine: &Engine) {}
}

/// A trace that does nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoTrace;
impl Trace for NoTrace {}
