//! This module defines the core data structures shared by the rule tables, the tape and the
//! execution engine: tape symbols, transitions, programs, halt outcomes, emitted events and the
//! crate-wide error type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::tape::Tape;
use crate::Rule;

/// Identifier of a control state. Used values are `0..=6`, `8` and `9`; state `7` does not exist.
pub type StateId = u8;

/// The state every run starts in.
pub const INITIAL_STATE: StateId = 0;
/// Borrow search state of the subtraction program. Hitting the left edge here means `a < b`.
pub const BORROW_STATE: StateId = 5;
/// Full-tape eraser entered after a negative subtraction result is detected.
pub const ERASE_STATE: StateId = 9;
/// Default delay between two observable effects, in milliseconds.
pub const DEFAULT_PACE_MS: u64 = 300;
/// Largest tape a configuration may ask for, in cells.
pub const MAX_TAPE_LEN: usize = 1 << 16;

/// A single tape cell value.
///
/// The numeric values match the three cell states of the physical tape: `0` is an empty cell,
/// `1` is a unary mark and `2` separates the two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Symbol {
    /// An empty cell.
    Blank = 0,
    /// One unit of an operand.
    Mark = 1,
    /// The boundary between the first and the second operand.
    Separator = 2,
}

impl Symbol {
    /// Returns the digit used to print this symbol.
    pub fn as_char(self) -> char {
        match self {
            Symbol::Blank => '0',
            Symbol::Mark => '1',
            Symbol::Separator => '2',
        }
    }

    /// Returns the symbol that follows this one when a cell is toggled by hand.
    pub fn cycle(self) -> Symbol {
        match self {
            Symbol::Blank => Symbol::Mark,
            Symbol::Mark => Symbol::Separator,
            Symbol::Separator => Symbol::Blank,
        }
    }
}

impl TryFrom<u8> for Symbol {
    type Error = MachineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Symbol::Blank),
            1 => Ok(Symbol::Mark),
            2 => Ok(Symbol::Separator),
            _ => Err(MachineError::InvalidSymbol(value.to_string())),
        }
    }
}

impl TryFrom<char> for Symbol {
    type Error = MachineError;

    /// Accepts the digits `0`, `1`, `2` as well as `_` for a blank and `|` for the separator.
    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            '0' | '_' => Ok(Symbol::Blank),
            '1' => Ok(Symbol::Mark),
            '2' | '|' => Ok(Symbol::Separator),
            _ => Err(MachineError::InvalidSymbol(value.to_string())),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Represents the possible head movements of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one cell to the left.
    Left,
    /// Move the head one cell to the right.
    Right,
    /// Stop the machine after writing.
    Halt,
}

/// A single entry of a rule table: what to write, where to move and which state comes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Symbol written into the current cell.
    pub write: Symbol,
    /// Head movement applied after the write.
    pub direction: Direction,
    /// The state the machine enters after moving.
    pub next_state: StateId,
}

/// The arithmetic operation a run performs. Each program owns one rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Program {
    Addition,
    Subtraction,
}

impl Program {
    /// Applies the operation to plain integers, `None` when the result would be negative.
    pub fn apply(self, a: usize, b: usize) -> Option<usize> {
        match self {
            Program::Addition => Some(a + b),
            Program::Subtraction => a.checked_sub(b),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Program::Addition => write!(f, "addition"),
            Program::Subtraction => write!(f, "subtraction"),
        }
    }
}

impl FromStr for Program {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "addition" | "add" | "+" => Ok(Program::Addition),
            "subtraction" | "sub" | "-" => Ok(Program::Subtraction),
            other => Err(MachineError::ValidationError(format!(
                "Unknown program: {other}"
            ))),
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Halt {
    /// The head tried to move left of cell 0; the tape holds the result.
    AtStart,
    /// The eraser swept past the right edge after a negative subtraction; the result is zero.
    NegativeCleanupComplete,
    /// A transition with a [`Direction::Halt`] movement fired.
    /// This is a success outcome, classified like `AtStart`.
    Rule,
    /// No transition is defined for the current state and symbol.
    NoRule { state: StateId, symbol: Symbol },
    /// The head left the tape in a state that does not allow it.
    OutOfBounds { head: usize, state: StateId },
}

impl Halt {
    /// Returns `true` when the run produced a result on the tape.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Halt::AtStart | Halt::NegativeCleanupComplete | Halt::Rule
        )
    }

    /// Returns `true` for structural failures of the tape or the rule table.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Halt::OutOfBounds { .. })
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::AtStart => write!(f, "arrived at tape start, result ready"),
            Halt::NegativeCleanupComplete => write!(f, "negative result, tape cleared (result 0)"),
            Halt::Rule => write!(f, "halted by rule"),
            Halt::NoRule { state, symbol } => {
                write!(f, "no transition for state {state} and symbol {symbol}")
            }
            Halt::OutOfBounds { head, state } => {
                write!(f, "head {head} out of bounds in state {state}")
            }
        }
    }
}

/// An observable side effect produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A symbol was written into a cell.
    CellChanged { index: usize, symbol: Symbol },
    /// The head moved to a new cell. `index` may equal the tape length once the eraser leaves the tape.
    HeadMoved { index: usize },
    /// The run ended.
    Halted(Halt),
}

/// Represents the outcome of a single engine step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The step was applied and the run goes on.
    Continue,
    /// The run ended during this step.
    Halt(Halt),
    /// No run is active, nothing happened.
    Idle,
}

/// Structured result of one step: the status plus every event emitted while applying it, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub step: Step,
    pub events: Vec<Event>,
}

impl StepResult {
    pub(crate) fn idle() -> Self {
        Self {
            step: Step::Idle,
            events: Vec::new(),
        }
    }
}

/// Startup configuration of a machine: the tape, an optional preselected program and the pacing
/// interval a renderer should wait between observable effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// A human-readable label for the configuration.
    pub name: String,
    /// Program to select right away, if any.
    pub program: Option<Program>,
    /// Initial tape contents. Its length is the tape length N.
    pub tape: Tape,
    /// Delay between two observable effects in milliseconds. Engine correctness never depends on it.
    pub pace_ms: u64,
}

impl MachineConfig {
    /// Returns the pacing interval as a `Duration`.
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }
}

/// Represents various errors that can occur while configuring or commanding the machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// A command that requires an idle machine arrived during a run.
    #[error("A run is already in progress")]
    AlreadyRunning,
    /// `run` was requested before any program was selected.
    #[error("No program selected, select addition or subtraction first")]
    NoProgramSelected,
    /// A cell index outside the tape.
    #[error("Cell index {index} is out of bounds for a tape of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    /// A replacement tape does not match the configured tape length.
    #[error("Tape length mismatch: expected {expected}, got {actual}")]
    TapeLengthMismatch { expected: usize, actual: usize },
    /// A character or number that is not a tape symbol.
    #[error("Invalid tape symbol: {0}")]
    InvalidSymbol(String),
    /// Indicates an error during the parsing of a machine configuration.
    #[error("Configuration parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates a configuration that parsed but does not describe a usable machine.
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to reading configuration files.
    #[error("File error: {0}")]
    FileError(String),
}
