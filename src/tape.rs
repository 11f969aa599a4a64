//! This module defines the `Tape`, a fixed-length row of ternary cells, together with the
//! unary operand encoding used by the arithmetic programs.

use crate::types::{MachineError, Symbol, MAX_TAPE_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fixed-length sequence of symbols.
///
/// The length is set when the tape is created and never changes; only the cell contents do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tape {
    cells: Vec<Symbol>,
}

impl Tape {
    /// Creates a tape of `len` blank cells.
    pub fn blank(len: usize) -> Self {
        Self {
            cells: vec![Symbol::Blank; len],
        }
    }

    /// Creates a tape holding exactly the given symbols.
    pub fn from_symbols(cells: Vec<Symbol>) -> Self {
        Self { cells }
    }

    /// Encodes two operands in unary on a tape of `len` cells.
    ///
    /// `a` marks start at cell 0, followed by one separator, `b` marks and blank padding.
    /// A zero first operand is written as a single blank cell before the separator.
    ///
    /// # Returns
    ///
    /// * `Ok(Tape)` if the operands fit with at least one trailing blank.
    /// * `Err(MachineError::ValidationError)` if the tape is too short or longer than
    ///   [`MAX_TAPE_LEN`].
    pub fn from_operands(a: usize, b: usize, len: usize) -> Result<Self, MachineError> {
        Self::check_len(len)?;
        let needed = Self::required_len(a, b)?;
        if len < needed {
            return Err(MachineError::ValidationError(format!(
                "Operands {a} and {b} need a tape of at least {needed} cells, got {len}"
            )));
        }

        let mut cells = Vec::with_capacity(len);
        if a == 0 {
            cells.push(Symbol::Blank);
        }
        cells.extend(std::iter::repeat(Symbol::Mark).take(a));
        cells.push(Symbol::Separator);
        cells.extend(std::iter::repeat(Symbol::Mark).take(b));
        cells.resize(len, Symbol::Blank);

        Ok(Self { cells })
    }

    /// Smallest tape length able to hold `a` and `b` with one trailing blank.
    ///
    /// Fails with `MachineError::ValidationError` when that length exceeds [`MAX_TAPE_LEN`].
    pub fn required_len(a: usize, b: usize) -> Result<usize, MachineError> {
        a.max(1)
            .checked_add(b)
            .and_then(|n| n.checked_add(2))
            .filter(|&n| n <= MAX_TAPE_LEN)
            .ok_or_else(|| {
                MachineError::ValidationError(format!(
                    "Operands {a} and {b} do not fit on a tape of at most {MAX_TAPE_LEN} cells"
                ))
            })
    }

    /// Rejects tape lengths above [`MAX_TAPE_LEN`].
    pub fn check_len(len: usize) -> Result<(), MachineError> {
        if len > MAX_TAPE_LEN {
            return Err(MachineError::ValidationError(format!(
                "Tape length {len} exceeds the maximum of {MAX_TAPE_LEN} cells"
            )));
        }
        Ok(())
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reads a cell, `None` outside the tape.
    pub fn get(&self, index: usize) -> Option<Symbol> {
        self.cells.get(index).copied()
    }

    /// Writes a cell.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the index is on the tape.
    /// * `Err(MachineError::IndexOutOfBounds)` otherwise; the tape is left untouched.
    pub fn set(&mut self, index: usize, symbol: Symbol) -> Result<(), MachineError> {
        let len = self.cells.len();
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(MachineError::IndexOutOfBounds { index, len })?;
        *cell = symbol;
        Ok(())
    }

    /// Advances a cell to its next symbol (blank, mark, separator, blank) and returns the new value.
    pub fn cycle(&mut self, index: usize) -> Result<Symbol, MachineError> {
        let len = self.cells.len();
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(MachineError::IndexOutOfBounds { index, len })?;
        *cell = cell.cycle();
        Ok(*cell)
    }

    /// Sets every cell back to blank.
    pub fn clear(&mut self) {
        self.cells.fill(Symbol::Blank);
    }

    /// Returns `true` if every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&s| s == Symbol::Blank)
    }

    /// Returns the cells as a slice.
    pub fn symbols(&self) -> &[Symbol] {
        &self.cells
    }

    /// Reads the unary number at the start of the tape.
    ///
    /// Leading blanks are skipped, then consecutive marks are counted. A result that starts at
    /// cell 0 therefore reads as "marks until the first blank".
    pub fn unary_value(&self) -> usize {
        self.cells
            .iter()
            .skip_while(|&&s| s == Symbol::Blank)
            .take_while(|&&s| s == Symbol::Mark)
            .count()
    }
}

impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.cells {
            write!(f, "{}", symbol.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Tape {
    type Err = MachineError;

    /// Parses compact notation such as `11210` or `11|1_`. Whitespace and commas are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cells = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(Symbol::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { cells })
    }
}

impl From<Vec<Symbol>> for Tape {
    fn from(cells: Vec<Symbol>) -> Self {
        Self::from_symbols(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_operands_layout() {
        let tape = Tape::from_operands(2, 1, 5).unwrap();
        assert_eq!(tape.to_string(), "11210");

        let tape = Tape::from_operands(3, 0, 7).unwrap();
        assert_eq!(tape.to_string(), "1112000");
    }

    #[test]
    fn test_from_operands_zero_first_operand_gets_leading_blank() {
        let tape = Tape::from_operands(0, 0, 5).unwrap();
        assert_eq!(tape.to_string(), "02000");

        let tape = Tape::from_operands(0, 2, 5).unwrap();
        assert_eq!(tape.to_string(), "02110");
    }

    #[test]
    fn test_from_operands_too_short() {
        let result = Tape::from_operands(2, 2, 5);
        assert!(matches!(result, Err(MachineError::ValidationError(_))));
        assert_eq!(Tape::required_len(2, 2), Ok(6));
    }

    #[test]
    fn test_oversized_operands_are_rejected() {
        assert!(matches!(
            Tape::required_len(usize::MAX, 1),
            Err(MachineError::ValidationError(_))
        ));
        assert!(matches!(
            Tape::required_len(1, usize::MAX - 1),
            Err(MachineError::ValidationError(_))
        ));
        assert!(Tape::required_len(MAX_TAPE_LEN, 0).is_err());
        assert_eq!(Tape::required_len(MAX_TAPE_LEN - 2, 0), Ok(MAX_TAPE_LEN));

        assert!(matches!(
            Tape::from_operands(usize::MAX, usize::MAX, 5),
            Err(MachineError::ValidationError(_))
        ));
        assert!(matches!(
            Tape::from_operands(1, 1, usize::MAX),
            Err(MachineError::ValidationError(_))
        ));
        assert_eq!(Tape::from_operands(1, 1, MAX_TAPE_LEN).unwrap().len(), MAX_TAPE_LEN);
    }

    #[test]
    fn test_set_out_of_bounds_leaves_tape_untouched() {
        let mut tape: Tape = "110".parse().unwrap();
        let result = tape.set(3, Symbol::Separator);

        assert_eq!(
            result,
            Err(MachineError::IndexOutOfBounds { index: 3, len: 3 })
        );
        assert_eq!(tape.to_string(), "110");
    }

    #[test]
    fn test_cycle_cell() {
        let mut tape = Tape::blank(2);
        assert_eq!(tape.cycle(1).unwrap(), Symbol::Mark);
        assert_eq!(tape.cycle(1).unwrap(), Symbol::Separator);
        assert_eq!(tape.cycle(1).unwrap(), Symbol::Blank);
        assert!(tape.cycle(2).is_err());
    }

    #[test]
    fn test_unary_value() {
        assert_eq!("11100".parse::<Tape>().unwrap().unary_value(), 3);
        assert_eq!("10000".parse::<Tape>().unwrap().unary_value(), 1);
        assert_eq!("01100".parse::<Tape>().unwrap().unary_value(), 2);
        assert_eq!("00000".parse::<Tape>().unwrap().unary_value(), 0);
        assert_eq!("11210".parse::<Tape>().unwrap().unary_value(), 2);
    }

    #[test]
    fn test_parse_notation() {
        let tape: Tape = "1 1 | 1 _".parse().unwrap();
        assert_eq!(
            tape.symbols(),
            &[
                Symbol::Mark,
                Symbol::Mark,
                Symbol::Separator,
                Symbol::Mark,
                Symbol::Blank
            ]
        );

        let tape: Tape = "1,2,1,1,0".parse().unwrap();
        assert_eq!(tape.to_string(), "12110");

        assert!("1x1".parse::<Tape>().is_err());
    }

    #[test]
    fn test_clear() {
        let mut tape: Tape = "12110".parse().unwrap();
        assert!(!tape.is_blank());
        tape.clear();
        assert!(tape.is_blank());
        assert_eq!(tape.len(), 5);
    }
}
