use std::fmt;

/// A parsed debugger command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Continue,
    Step,
    Registers,
    Memory { addr: u16, count: u16 },
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    UnknownName,
    MissingAddress,
    InvalidInteger,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownName => write!(f, "type 'help' for help"),
            Self::MissingAddress => write!(f, "expected an address argument"),
            Self::InvalidInteger => write!(f, "expected a decimal or 0x-prefixed integer"),
        }
    }
}

impl Command {
    /// First-letter dispatch: any word starting with the letter of a known
    /// command matches, so `s`, `st` and `step` are all the same command.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Empty)?;

        let command = match name
            .chars()
            .next()
            .expect("split_whitespace yields non-empty words")
            .to_ascii_lowercase()
        {
            'h' => Self::Help,
            'c' => Self::Continue,
            's' => Self::Step,
            'r' => Self::Registers,
            'm' => {
                let addr = words.next().ok_or(CommandError::MissingAddress)?;
                let addr = parse_integer(addr).ok_or(CommandError::InvalidInteger)?;
                let count = match words.next() {
                    None => 1,
                    Some(word) => parse_integer(word).ok_or(CommandError::InvalidInteger)?,
                };
                Self::Memory { addr, count }
            }
            _ => return Err(CommandError::UnknownName),
        };
        Ok(command)
    }
}

/// Decimal, or hex with a `0x` or `x` prefix.
fn parse_integer(word: &str) -> Option<u16> {
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix('x')) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        word.parse().ok()
    }
}
