pub mod cli;
pub mod dump;
pub mod reference;
pub mod trace;
