//! This module provides functions for analyzing machine configurations before a run. The engine
//! itself accepts any tape; these checks catch operand encodings that the built-in programs cannot
//! compute with, such as a missing separator or no room for the head past the second operand.

use crate::types::{MachineConfig, MachineError, Symbol};

/// Represents the problems that can be found in a configured tape.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisError {
    /// The tape has no cells at all.
    EmptyTape,
    /// No separator between the operands.
    MissingSeparator,
    /// More than one separator; holds the number found.
    MultipleSeparators(usize),
    /// A cell that breaks the unary encoding of the first operand.
    InvalidFirstOperand(usize),
    /// A cell that breaks the unary encoding of the second operand.
    InvalidSecondOperand(usize),
    /// The last cell is not blank, so the head would run off the tape.
    NoTrailingBlank,
}

impl From<AnalysisError> for MachineError {
    /// Converts an `AnalysisError` into a `MachineError::ValidationError`.
    fn from(error: AnalysisError) -> Self {
        let message = match error {
            AnalysisError::EmptyTape => "Tape has no cells".to_string(),
            AnalysisError::MissingSeparator => "Tape has no separator".to_string(),
            AnalysisError::MultipleSeparators(count) => {
                format!("Tape has {count} separators, expected exactly one")
            }
            AnalysisError::InvalidFirstOperand(index) => {
                format!("Cell {index} is not part of a unary first operand")
            }
            AnalysisError::InvalidSecondOperand(index) => {
                format!("Cell {index} is not part of a unary second operand")
            }
            AnalysisError::NoTrailingBlank => {
                "Tape needs at least one blank cell after the second operand".to_string()
            }
        };

        MachineError::ValidationError(message)
    }
}

/// Analyzes a configuration's tape.
///
/// # Returns
///
/// * `Ok(())` if no errors are found.
/// * `Err(MachineError::ValidationError)` describing the first problem otherwise.
pub fn analyze(config: &MachineConfig) -> Result<(), MachineError> {
    let cells = config.tape.symbols();

    [
        check_length,
        check_separator,
        check_first_operand,
        check_second_operand,
        check_trailing_blank,
    ]
    .iter()
    .try_for_each(|check| check(cells))
    .map_err(Into::into)
}

fn check_length(cells: &[Symbol]) -> Result<(), AnalysisError> {
    if cells.is_empty() {
        return Err(AnalysisError::EmptyTape);
    }
    Ok(())
}

fn check_separator(cells: &[Symbol]) -> Result<(), AnalysisError> {
    match cells.iter().filter(|&&s| s == Symbol::Separator).count() {
        0 => Err(AnalysisError::MissingSeparator),
        1 => Ok(()),
        count => Err(AnalysisError::MultipleSeparators(count)),
    }
}

/// The first operand is a run of marks, optionally preceded by one blank cell.
fn check_first_operand(cells: &[Symbol]) -> Result<(), AnalysisError> {
    let first = &cells[..separator_index(cells)];
    let skip = usize::from(first.first() == Some(&Symbol::Blank));

    match first.iter().skip(skip).position(|&s| s != Symbol::Mark) {
        Some(offset) => Err(AnalysisError::InvalidFirstOperand(skip + offset)),
        None => Ok(()),
    }
}

/// The second operand is a run of marks followed by nothing but blanks.
fn check_second_operand(cells: &[Symbol]) -> Result<(), AnalysisError> {
    let start = separator_index(cells) + 1;
    let rest = &cells[start.min(cells.len())..];
    let marks = rest.iter().take_while(|&&s| s == Symbol::Mark).count();

    match rest[marks..].iter().position(|&s| s != Symbol::Blank) {
        Some(offset) => Err(AnalysisError::InvalidSecondOperand(start + marks + offset)),
        None => Ok(()),
    }
}

fn check_trailing_blank(cells: &[Symbol]) -> Result<(), AnalysisError> {
    match cells.last() {
        Some(Symbol::Blank) => Ok(()),
        _ => Err(AnalysisError::NoTrailingBlank),
    }
}

fn separator_index(cells: &[Symbol]) -> usize {
    cells
        .iter()
        .position(|&s| s == Symbol::Separator)
        .unwrap_or(cells.len())
}
