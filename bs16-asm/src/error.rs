use std::fmt::{Display, Formatter, Debug};
use std::error::Error;

use bs16_sim::SimulationError;

pub type AssemblyResult<T> = std::result::Result<T, AssemblyError>;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AssemblyErrorKind {
    InvalidLine,
    UnknownMnemonic,
    InvalidOperands,
    InvalidConstant,
    ConstantOutOfRange,
    InvalidMemoryLine,
    ProgramTooLarge,
    UnknownSection,
    OutsideSection,
    UnknownField,
    FieldOutOfRange,
    InvalidMicroWord,
    DuplicateAddress,
    Io
}
impl AssemblyErrorKind {
    pub(self) fn as_str(&self) -> &'static str {
        match *self {
            AssemblyErrorKind::InvalidLine => "malformed line",
            AssemblyErrorKind::UnknownMnemonic => "unknown mnemonic",
            AssemblyErrorKind::InvalidOperands => "invalid operands",
            AssemblyErrorKind::InvalidConstant => "invalid constant",
            AssemblyErrorKind::ConstantOutOfRange => "constant out of range",
            AssemblyErrorKind::InvalidMemoryLine => "invalid memory initialization line",
            AssemblyErrorKind::ProgramTooLarge => "program does not fit in memory",
            AssemblyErrorKind::UnknownSection => "unknown section",
            AssemblyErrorKind::OutsideSection => "definition outside of any section",
            AssemblyErrorKind::UnknownField => "unknown microinstruction field",
            AssemblyErrorKind::FieldOutOfRange => "value does not fit in the field",
            AssemblyErrorKind::InvalidMicroWord => "invalid microinstruction",
            AssemblyErrorKind::DuplicateAddress => "address defined twice",
            AssemblyErrorKind::Io => "i/o error"
        }
    }
}

#[derive(Debug)]
struct CustomError {
    pub(self) kind: AssemblyErrorKind,
    pub(self) error: Box<dyn Error + Send + Sync>,
}

enum ErrorSource {
    Internal(AssemblyErrorKind),
    External(Box<CustomError>)
}
impl Debug for ErrorSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            ErrorSource::External(ref c) => Debug::fmt(c, f),
            ErrorSource::Internal(kind) => f.debug_tuple("Kind").field(&kind).finish()
        }
    }
}

/// An error raised while assembling a program or a microprogram.
///
/// Errors found while reading a source are tagged with the 1-based line number and the text of
/// the offending line.
pub struct AssemblyError {
    pub(self) line: Option<usize>,
    pub(self) text: Option<String>,
    pub(self) description: Option<String>,
    pub(self) source: ErrorSource
}
impl AssemblyError {
    pub fn new<E>(kind: AssemblyErrorKind, error: E) -> Self
        where
            E: Into<Box<dyn Error + Send + Sync>>
    {
        AssemblyError {
            line: None,
            text: None,
            description: None,
            source: ErrorSource::External(Box::new(CustomError {
                kind,
                error: error.into()
            }))
        }
    }

    pub fn with_description<S>(kind: AssemblyErrorKind, description: S) -> Self
        where
            S: Into<String>
    {
        AssemblyError {
            line: None,
            text: None,
            description: Some(description.into()),
            source: ErrorSource::Internal(kind)
        }
    }

    /// Tags the error with the line it was found on, unless it is already tagged.
    pub fn at_line<S>(mut self, line: usize, text: S) -> Self
        where
            S: Into<String>
    {
        if self.line.is_none() {
            self.line = Some(line);
            self.text = Some(text.into());
        }
        self
    }

    pub fn get_ref(&self) -> Option<&(dyn Error + Send + Sync)> {
        match self.source {
            ErrorSource::External(ref c) => Some(&*c.error),
            ErrorSource::Internal(_) => None
        }
    }

    pub fn into_inner(self) -> Option<Box<dyn Error + Send + Sync>> {
        match self.source {
            ErrorSource::External(c) => Some(c.error),
            ErrorSource::Internal(_) => None
        }
    }

    pub fn kind(&self) -> AssemblyErrorKind {
        match self.source {
            ErrorSource::External(ref c) => c.kind,
            ErrorSource::Internal(kind) => kind
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn description(&self) -> String {
        match (&self.description, &self.source) {
            (Some(d), _) => d.to_owned(),
            (None, ErrorSource::External(c)) => c.error.to_string(),
            (None, ErrorSource::Internal(kind)) => kind.as_str().to_owned()
        }
    }
}
impl From<AssemblyErrorKind> for AssemblyError {
    fn from(kind: AssemblyErrorKind) -> Self {
        AssemblyError {
            line: None,
            text: None,
            description: None,
            source: ErrorSource::Internal(kind)
        }
    }
}
impl From<std::io::Error> for AssemblyError {
    fn from(error: std::io::Error) -> Self {
        AssemblyError::new(AssemblyErrorKind::Io, error)
    }
}
impl From<SimulationError> for AssemblyError {
    fn from(error: SimulationError) -> Self {
        AssemblyError::new(AssemblyErrorKind::InvalidMicroWord, error)
    }
}
impl Debug for AssemblyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyError")
            .field("line", &self.line)
            .field("description", &self.description)
            .field("source", &self.source)
            .finish()
    }
}
impl Display for AssemblyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = self.kind().as_str();
        let description = self.description();
        if description == kind {
            write!(f, "{}", kind)?;
        } else {
            write!(f, "{}: {}", kind, description)?;
        }
        if let Some(line) = self.line {
            write!(f, " on line {}", line)?;
        }
        if let Some(ref text) = self.text {
            write!(f, " `{}`", text)?;
        }
        Ok(())
    }
}
impl Error for AssemblyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.source {
            ErrorSource::Internal(_) => None,
            ErrorSource::External(ref c) => c.error.source()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bs16_sim::SimulationErrorKind;

    #[test]
    fn internal_error_display() {
        let error = AssemblyError::with_description(AssemblyErrorKind::UnknownMnemonic, "`mul`")
            .at_line(3, "mul r1 r2");
        assert_eq!(error.to_string(), "unknown mnemonic: `mul` on line 3 `mul r1 r2`");
        assert_eq!(error.kind(), AssemblyErrorKind::UnknownMnemonic);
        assert!(error.get_ref().is_none());
    }

    #[test]
    fn bare_kind_display() {
        let error = AssemblyError::from(AssemblyErrorKind::InvalidLine).at_line(1, "x").at_line(2, "y");
        assert_eq!(error.to_string(), "malformed line on line 1 `x`");
        assert_eq!(error.line(), Some(1));
        assert_eq!(error.text(), Some("x"));
    }

    #[test]
    fn wraps_simulation_errors() {
        let inner = SimulationError::from(SimulationErrorKind::OutOfRange);
        let error = AssemblyError::from(inner);
        assert_eq!(error.kind(), AssemblyErrorKind::InvalidMicroWord);
        assert_eq!(error.to_string(), "invalid microinstruction: value out of range");
        assert!(error.into_inner().is_some());
    }
}
