//! Input command protocol.
//!
//! Every input line carries exactly one integer. Four reserved negative
//! values are control signals, every other integer is an absolute target
//! position in driver units.
//!
//! | Value | Command     |
//! |-------|-------------|
//! | `-1`  | `Reset`     |
//! | `-2`  | `Disengage` |
//! | `-3`  | `Engage`    |
//! | `-4`  | `MakeNoise` |
//! | other | `MoveTo(n)` |

use crate::consts::{CONTROL_DISENGAGE, CONTROL_ENGAGE, CONTROL_MAKE_NOISE, CONTROL_RESET};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single decoded input command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Run the homing sequence and return to logical position 0.
    Reset,
    /// Release holding torque.
    Disengage,
    /// Apply holding torque.
    Engage,
    /// Small forward-and-back jitter as a presence signal.
    MakeNoise,
    /// Move to an absolute position.
    MoveTo(i64),
}

/// Command kind without payload, used for bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    /// [`Command::Reset`]
    Reset,
    /// [`Command::Disengage`]
    Disengage,
    /// [`Command::Engage`]
    Engage,
    /// [`Command::MakeNoise`]
    MakeNoise,
    /// [`Command::MoveTo`]
    MoveTo,
}

/// Error returned when an input line is not an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed command {line:?}: expected an integer")]
pub struct CommandParseError {
    /// The offending line, whitespace trimmed.
    pub line: String,
}

impl Command {
    /// Classify a raw integer value.
    pub fn from_value(value: i64) -> Self {
        match value {
            CONTROL_RESET => Command::Reset,
            CONTROL_DISENGAGE => Command::Disengage,
            CONTROL_ENGAGE => Command::Engage,
            CONTROL_MAKE_NOISE => Command::MakeNoise,
            position => Command::MoveTo(position),
        }
    }

    /// Wire value of this command.
    pub fn value(&self) -> i64 {
        match *self {
            Command::Reset => CONTROL_RESET,
            Command::Disengage => CONTROL_DISENGAGE,
            Command::Engage => CONTROL_ENGAGE,
            Command::MakeNoise => CONTROL_MAKE_NOISE,
            Command::MoveTo(position) => position,
        }
    }

    /// Payload-free kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Reset => CommandKind::Reset,
            Command::Disengage => CommandKind::Disengage,
            Command::Engage => CommandKind::Engage,
            Command::MakeNoise => CommandKind::MakeNoise,
            Command::MoveTo(_) => CommandKind::MoveTo,
        }
    }

    /// Returns true for commands that move the axis and refresh the idle timer.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Command::Reset | Command::MakeNoise | Command::MoveTo(_)
        )
    }
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<i64>()
            .map(Command::from_value)
            .map_err(|_| CommandParseError {
                line: trimmed.to_string(),
            })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Reset => write!(f, "reset"),
            Command::Disengage => write!(f, "disengage"),
            Command::Engage => write!(f, "engage"),
            Command::MakeNoise => write!(f, "make-noise"),
            Command::MoveTo(position) => write!(f, "move-to {position}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_values_map_to_control_commands() {
        assert_eq!("-1".parse::<Command>().unwrap(), Command::Reset);
        assert_eq!("-2".parse::<Command>().unwrap(), Command::Disengage);
        assert_eq!("-3".parse::<Command>().unwrap(), Command::Engage);
        assert_eq!("-4".parse::<Command>().unwrap(), Command::MakeNoise);
    }

    #[test]
    fn other_integers_are_targets() {
        assert_eq!("0".parse::<Command>().unwrap(), Command::MoveTo(0));
        assert_eq!("100".parse::<Command>().unwrap(), Command::MoveTo(100));
        assert_eq!("-5".parse::<Command>().unwrap(), Command::MoveTo(-5));
        assert_eq!("-1000".parse::<Command>().unwrap(), Command::MoveTo(-1000));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!("  42\n".parse::<Command>().unwrap(), Command::MoveTo(42));
        assert_eq!("-3\r\n".parse::<Command>().unwrap(), Command::Engage);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let err = "abc".parse::<Command>().unwrap_err();
        assert_eq!(err.line, "abc");
        assert!(err.to_string().contains("abc"));

        assert!("".parse::<Command>().is_err());
        assert!("\n".parse::<Command>().is_err());
        assert!("1.5".parse::<Command>().is_err());
        assert!("12 34".parse::<Command>().is_err());
    }

    #[test]
    fn value_inverts_classification() {
        for v in [-4, -3, -2, -1, 0, 7, -9, 5500] {
            assert_eq!(Command::from_value(v).value(), v);
        }
    }

    #[test]
    fn only_moves_count_as_motion() {
        assert!(Command::Reset.is_motion());
        assert!(Command::MakeNoise.is_motion());
        assert!(Command::MoveTo(10).is_motion());
        assert!(!Command::Engage.is_motion());
        assert!(!Command::Disengage.is_motion());
    }

    #[test]
    fn display_names() {
        assert_eq!(Command::MoveTo(12).to_string(), "move-to 12");
        assert_eq!(Command::MakeNoise.to_string(), "make-noise");
        assert_eq!(Command::Reset.kind(), CommandKind::Reset);
    }
}
