use std::fmt::{Display, Formatter, Debug};
use std::error::Error;

pub type SimulationResult<T> = std::result::Result<T, SimulationError>;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SimulationErrorKind {
    OutOfRange,
    IllegalResultSelect,
    IllegalStatusSelect,
    StackOverflow,
    StackUnderflow,
    InvalidControllerInstruction,
    MalformedIcField,
    UnmappedMacroOpcode,
    UnmappedMicroAddress
}
impl SimulationErrorKind {
    pub(self) fn as_str(&self) -> &'static str {
        match *self {
            SimulationErrorKind::OutOfRange => "value out of range",
            SimulationErrorKind::IllegalResultSelect => "illegal ALU result select",
            SimulationErrorKind::IllegalStatusSelect => "illegal status unit select",
            SimulationErrorKind::StackOverflow => "sequencer stack overflow",
            SimulationErrorKind::StackUnderflow => "sequencer stack underflow",
            SimulationErrorKind::InvalidControllerInstruction => "invalid controller instruction",
            SimulationErrorKind::MalformedIcField => "more than one instruction counter control bit set",
            SimulationErrorKind::UnmappedMacroOpcode => "macro opcode not present in the mapping PROM",
            SimulationErrorKind::UnmappedMicroAddress => "micro-address not present in the control store"
        }
    }
}

/// A fatal engine condition.
///
/// Besides its kind, the error remembers the offending value (as a human readable detail) and,
/// once it leaves the engine, the micro-address that was being executed.
pub struct SimulationError {
    kind: SimulationErrorKind,
    detail: Option<String>,
    micro_address: Option<u16>
}
impl SimulationError {
    pub fn with_detail<S>(kind: SimulationErrorKind, detail: S) -> Self
    where
        S: Into<String>
    {
        SimulationError {
            kind,
            detail: Some(detail.into()),
            micro_address: None
        }
    }

    /// Attaches the micro-address being executed, unless one is already known.
    pub fn at(mut self, micro_address: u16) -> Self {
        if self.micro_address.is_none() {
            self.micro_address = Some(micro_address);
        }
        self
    }

    pub fn kind(&self) -> SimulationErrorKind {
        self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn micro_address(&self) -> Option<u16> {
        self.micro_address
    }
}
impl From<SimulationErrorKind> for SimulationError {
    fn from(kind: SimulationErrorKind) -> Self {
        SimulationError {
            kind,
            detail: None,
            micro_address: None
        }
    }
}
impl Debug for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationError")
            .field("kind", &self.kind)
            .field("detail", &self.detail)
            .field("micro_address", &self.micro_address)
            .finish()
    }
}
impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if let Some(ref detail) = self.detail {
            write!(f, " ({})", detail)?;
        }
        if let Some(address) = self.micro_address {
            write!(f, " at micro-address {:#05X}", address)?;
        }
        Ok(())
    }
}
impl Error for SimulationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail_and_address() {
        let error = SimulationError::with_detail(SimulationErrorKind::MalformedIcField, "0b0011").at(0x12);
        assert_eq!(error.to_string(), "more than one instruction counter control bit set (0b0011) at micro-address 0x012");
    }

    #[test]
    fn first_address_wins() {
        let error = SimulationError::from(SimulationErrorKind::StackOverflow).at(3).at(7);
        assert_eq!(error.micro_address(), Some(3));
        assert_eq!(error.kind(), SimulationErrorKind::StackOverflow);
        assert!(error.detail().is_none());
    }
}
