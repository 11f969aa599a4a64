//! Observation surface for renderers. The engine never calls an observer while stepping; callers
//! forward the events returned by each step, which lets them pace delivery however they like.

use crate::types::{Event, Halt, Symbol};

/// Receives the observable effects of a run.
///
/// Every method has an empty default, so an observer only implements what it displays.
pub trait Observer {
    /// A symbol was written into the cell at `index`.
    fn on_cell_changed(&mut self, _index: usize, _symbol: Symbol) {}

    /// The head moved to `index`.
    fn on_head_moved(&mut self, _index: usize) {}

    /// The run ended.
    fn on_halted(&mut self, _halt: &Halt) {}
}

impl Event {
    /// Delivers this event to the matching observer method.
    pub fn notify<O: Observer + ?Sized>(&self, observer: &mut O) {
        match self {
            Event::CellChanged { index, symbol } => observer.on_cell_changed(*index, *symbol),
            Event::HeadMoved { index } => observer.on_head_moved(*index),
            Event::Halted(halt) => observer.on_halted(halt),
        }
    }
}

/// Records every event, in delivery order.
impl Observer for Vec<Event> {
    fn on_cell_changed(&mut self, index: usize, symbol: Symbol) {
        self.push(Event::CellChanged { index, symbol });
    }

    fn on_head_moved(&mut self, index: usize) {
        self.push(Event::HeadMoved { index });
    }

    fn on_halted(&mut self, halt: &Halt) {
        self.push(Event::Halted(halt.clone()));
    }
}
