//! This crate provides the core logic of a unary calculator built as a Turing machine.
//! It includes the addition and subtraction rule tables, a fixed-length ternary tape, the
//! stepping engine with its command interface, and loading of machine configurations.

pub mod analyzer;
pub mod loader;
pub mod machine;
pub mod observer;
pub mod parser;
pub mod table;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `AnalysisError` enum from the analyzer module.
pub use analyzer::{analyze, AnalysisError};
/// Re-exports the `ConfigLoader` struct from the loader module.
pub use loader::ConfigLoader;
/// Re-exports the engine and its run state from the machine module.
pub use machine::{MachineState, TuringMachine};
/// Re-exports the `Observer` trait from the observer module.
pub use observer::Observer;
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports the rule tables from the table module.
pub use table::{RuleTable, ADDITION, SUBTRACTION};
/// Re-exports the `Tape` struct from the tape module.
pub use tape::Tape;
/// Re-exports the types describing symbols, transitions, programs and run outcomes.
pub use types::{
    Direction, Event, Halt, MachineConfig, MachineError, Program, StateId, Step, StepResult,
    Symbol, Transition,
};
