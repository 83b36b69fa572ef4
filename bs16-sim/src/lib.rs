pub mod bus;
pub mod error;
pub mod memory;
pub mod processor;
pub mod snapshot;
pub mod trace;

pub use error::{SimulationError, SimulationErrorKind, SimulationResult};
pub use processor::{CycleOutcome, Engine, RunOutcome, DEFAULT_STEP_LIMIT};
pub use snapshot::Snapshot;
pub use trace::{NoTrace, Trace};
