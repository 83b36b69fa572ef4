pub mod error;
pub mod instruction;
pub mod lexer;
pub mod microprogram;
pub mod program;

pub use error::{AssemblyError, AssemblyErrorKind, AssemblyResult};
pub use instruction::{Instruction, Opcode};
pub use microprogram::Microprogram;
pub use program::Assembly;
