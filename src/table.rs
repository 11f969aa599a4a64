//! The two built-in rule tables. They are built once, on first use, and never change afterwards.

use crate::types::{Direction, Program, StateId, Symbol, Transition};
use std::collections::{BTreeSet, HashMap};

use Direction::{Halt, Left, Right};
use Symbol::{Blank, Mark, Separator};

/// One rule table row: `(state, read, write, direction, next_state)`.
type Entry = (StateId, Symbol, Symbol, Direction, StateId);

// Operands may start at cell 0 or after a single leading blank, hence the three state 0 rows.
const ADDITION_RULES: [Entry; 13] = [
    (0, Blank, Blank, Right, 1),
    (0, Mark, Mark, Right, 1),
    (0, Separator, Mark, Right, 2),
    // seek the separator and turn it into a mark
    (1, Mark, Mark, Right, 1),
    (1, Separator, Mark, Right, 2),
    (1, Blank, Blank, Halt, 0),
    // seek the end of the second operand
    (2, Mark, Mark, Right, 2),
    (2, Blank, Blank, Left, 3),
    // drop the surplus mark
    (3, Mark, Blank, Left, 4),
    (3, Separator, Blank, Left, 4),
    // back to the start
    (4, Mark, Mark, Left, 4),
    (4, Separator, Mark, Left, 4),
    (4, Blank, Blank, Halt, 0),
];

const SUBTRACTION_RULES: [Entry; 23] = [
    (0, Blank, Blank, Right, 1),
    (0, Mark, Mark, Right, 1),
    (0, Separator, Separator, Right, 2),
    // seek the separator
    (1, Mark, Mark, Right, 1),
    (1, Separator, Separator, Right, 2),
    (1, Blank, Blank, Halt, 0),
    // seek the end of b
    (2, Mark, Mark, Right, 2),
    (2, Blank, Blank, Left, 3),
    // erase one mark of b
    (3, Mark, Blank, Left, 4),
    (3, Separator, Blank, Left, 8),
    (3, Blank, Blank, Left, 3),
    // return to the separator
    (4, Mark, Mark, Left, 4),
    (4, Blank, Blank, Left, 4),
    (4, Separator, Separator, Left, 5),
    // borrow one mark from a
    (5, Blank, Blank, Left, 5),
    (5, Mark, Blank, Right, 6),
    (6, Blank, Blank, Right, 6),
    (6, Separator, Separator, Right, 2),
    // b exhausted, walk home
    (8, Mark, Mark, Left, 8),
    (8, Blank, Blank, Left, 8),
    // negative result, wipe everything
    (9, Blank, Blank, Right, 9),
    (9, Mark, Blank, Right, 9),
    (9, Separator, Blank, Right, 9),
];

lazy_static::lazy_static! {
    pub static ref ADDITION: RuleTable = RuleTable::from_entries(&ADDITION_RULES);
    pub static ref SUBTRACTION: RuleTable = RuleTable::from_entries(&SUBTRACTION_RULES);
}

/// An immutable mapping from `(state, symbol)` to a [`Transition`].
///
/// A missing entry is not an error in the table; it is how the machine halts.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    rules: HashMap<(StateId, Symbol), Transition>,
}

impl RuleTable {
    /// Returns the shared table for a program.
    pub fn for_program(program: Program) -> &'static RuleTable {
        match program {
            Program::Addition => &*ADDITION,
            Program::Subtraction => &*SUBTRACTION,
        }
    }

    fn from_entries(entries: &[Entry]) -> Self {
        let rules = entries
            .iter()
            .map(|&(state, read, write, direction, next_state)| {
                (
                    (state, read),
                    Transition {
                        write,
                        direction,
                        next_state,
                    },
                )
            })
            .collect();

        Self { rules }
    }

    /// Finds the transition for a state and the symbol under the head.
    pub fn lookup(&self, state: StateId, symbol: Symbol) -> Option<&Transition> {
        self.rules.get(&(state, symbol))
    }

    /// Number of transitions in the table.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every state that has at least one outgoing transition, in ascending order.
    pub fn states(&self) -> BTreeSet<StateId> {
        self.rules.keys().map(|&(state, _)| state).collect()
    }
}
