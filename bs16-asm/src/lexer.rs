use crate::error::{AssemblyError, AssemblyErrorKind, AssemblyResult};

/// Number of general purpose registers addressable from a macro instruction.
pub const REGISTER_COUNT: u8 = 16;

/// A single operand or word of a source line.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Token {
    /// `rN`
    Register(u8),
    /// `[rN]`
    Indirect(u8),
    Constant(u16),
    Word(String)
}

/// Lowercases `line`, drops the `;` comment and collapses whitespace and commas into single spaces.
pub fn normalize(line: &str) -> String {
    let code = match line.find(';') {
        Some(start) => &line[..start],
        None => line
    };
    code.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parses a decimal, `0x` hexadecimal or `0b` binary number. Underscores are ignored.
pub fn parse_number(text: &str) -> Option<u128> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    let (digits, radix) = if let Some(hex) = digits.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = digits.strip_prefix("0b") {
        (bin, 2)
    } else {
        (&digits[..], 10)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u128::from_str_radix(digits, radix).ok()
}

/// Parses a 16-bit literal.
pub fn parse_constant(text: &str) -> AssemblyResult<u16> {
    let value = parse_number(text)
        .ok_or_else(|| AssemblyError::with_description(AssemblyErrorKind::InvalidConstant, format!("`{}`", text)))?;
    if value > u128::from(u16::MAX) {
        Err(AssemblyError::with_description(
            AssemblyErrorKind::ConstantOutOfRange,
            format!("{} does not fit in 16 bits", text)
        ))
    } else {
        Ok(value as u16)
    }
}

fn parse_register(text: &str) -> Option<AssemblyResult<u8>> {
    let index = text.strip_prefix('r')?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(match index.parse::<u8>() {
        Ok(index) if index < REGISTER_COUNT => Ok(index),
        _ => Err(AssemblyError::with_description(
            AssemblyErrorKind::InvalidOperands,
            format!("there is no register `{}`", text)
        ))
    })
}

impl Token {
    pub fn parse(word: &str) -> AssemblyResult<Token> {
        if let Some(inner) = word.strip_prefix('[').and_then(|w| w.strip_suffix(']')) {
            return match parse_register(inner) {
                Some(index) => index.map(Token::Indirect),
                None => Err(AssemblyError::with_description(
                    AssemblyErrorKind::InvalidOperands,
                    format!("`{}` is not a memory operand", word)
                ))
            };
        }
        if let Some(index) = parse_register(word) {
            return index.map(Token::Register);
        }
        if word.starts_with(|c: char| c.is_ascii_digit()) {
            return parse_constant(word).map(Token::Constant);
        }
        Ok(Token::Word(word.to_owned()))
    }
}

/// Splits a line into tokens. Returns an empty list for blank or comment-only lines.
pub fn tokenize(line: &str) -> AssemblyResult<Vec<Token>> {
    normalize(line)
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(Token::parse)
        .collect()
}
