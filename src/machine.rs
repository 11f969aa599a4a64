//! This module defines the `TuringMachine` struct, the execution engine of the unary calculator.
//! It owns the tape and the run state, accepts the select/run/reset commands and applies one
//! transition per `step`, returning the events each transition produced.

use crate::observer::Observer;
use crate::table::RuleTable;
use crate::tape::Tape;
use crate::types::{
    Direction, Event, Halt, MachineConfig, MachineError, Program, StateId, Step, StepResult,
    Symbol, BORROW_STATE, ERASE_STATE, INITIAL_STATE,
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

/// The mutable run state of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MachineState {
    /// Current head position. Equals the tape length once the eraser has left the tape.
    pub head: usize,
    /// Current control state.
    pub state: StateId,
    /// Whether a run is in progress.
    pub running: bool,
    /// The program the next run will execute.
    pub selected_program: Option<Program>,
}

/// A single-tape machine running the built-in addition and subtraction tables.
///
/// The machine is driven by commands (`select_program`, `run`, `reset`) and advanced by `step`.
/// `step` never sleeps; pacing the returned events is up to the caller.
#[derive(Debug, Clone)]
pub struct TuringMachine {
    tape: Tape,
    machine: MachineState,
    /// The program of the run in progress, fixed when the run starts.
    active: Option<Program>,
    step_count: usize,
}

impl TuringMachine {
    /// Creates a new idle machine over the given tape.
    pub fn new(tape: Tape) -> Self {
        Self {
            tape,
            machine: MachineState::default(),
            active: None,
            step_count: 0,
        }
    }

    /// Creates a machine from a configuration, selecting its program when one is given.
    pub fn from_config(config: &MachineConfig) -> Self {
        let mut machine = Self::new(config.tape.clone());
        machine.machine.selected_program = config.program;
        machine
    }

    /// Chooses the program for the next run.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the machine is idle.
    /// * `Err(MachineError::AlreadyRunning)` during a run; the selection is left unchanged.
    pub fn select_program(&mut self, program: Program) -> Result<(), MachineError> {
        self.ensure_idle("select program")?;
        self.machine.selected_program = Some(program);
        info!("{program} selected");
        Ok(())
    }

    /// Starts a run of the selected program from cell 0 in the initial state.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the run started.
    /// * `Err(MachineError::AlreadyRunning)` if a run is in progress; nothing changes.
    /// * `Err(MachineError::NoProgramSelected)` if no program was chosen.
    pub fn run(&mut self) -> Result<(), MachineError> {
        self.ensure_idle("run")?;
        let Some(program) = self.machine.selected_program else {
            warn!("run rejected: no program selected");
            return Err(MachineError::NoProgramSelected);
        };

        self.active = Some(program);
        self.machine.running = true;
        self.machine.head = 0;
        self.machine.state = INITIAL_STATE;
        self.step_count = 0;
        info!("running {program} on tape {}", self.tape);
        Ok(())
    }

    /// Cancels any run and returns the machine to its initial configuration: head on cell 0,
    /// state 0, no program selected and every cell blank.
    pub fn reset(&mut self) {
        if self.machine.running {
            info!("run cancelled after {} steps", self.step_count);
        }
        self.machine = MachineState::default();
        self.active = None;
        self.tape.clear();
        self.step_count = 0;
        info!("machine reset");
    }

    /// Executes a single transition of the active run.
    ///
    /// The symbol write is applied before the head move and both are committed before this
    /// returns. Once the run ends the halt is appended to the events as `Event::Halted`.
    ///
    /// # Returns
    ///
    /// * `Step::Continue` if the machine performed a step and keeps running.
    /// * `Step::Halt(_)` if the run ended during this step.
    /// * `Step::Idle` if no run is active.
    pub fn step(&mut self) -> StepResult {
        let (true, Some(program)) = (self.machine.running, self.active) else {
            self.machine.running = false;
            self.active = None;
            return StepResult::idle();
        };

        let mut events = Vec::new();
        let step = self.advance(program, &mut events);
        self.step_count += 1;

        if let Step::Halt(halt) = &step {
            self.machine.running = false;
            self.active = None;
            if halt.is_fatal() {
                error!("run aborted after {} steps: {halt}", self.step_count);
            } else {
                info!("run finished after {} steps: {halt}", self.step_count);
            }
            events.push(Event::Halted(halt.clone()));
        }

        StepResult { step, events }
    }

    fn advance(&mut self, program: Program, events: &mut Vec<Event>) -> Step {
        let head = self.machine.head;
        let state = self.machine.state;

        let Some(symbol) = self.tape.get(head) else {
            // Only the eraser may leave the tape, and only over the right edge.
            return if state == ERASE_STATE {
                Step::Halt(Halt::NegativeCleanupComplete)
            } else {
                Step::Halt(Halt::OutOfBounds { head, state })
            };
        };

        let Some(transition) = RuleTable::for_program(program).lookup(state, symbol).copied()
        else {
            return Step::Halt(Halt::NoRule { state, symbol });
        };

        debug!(
            "q{state} read {symbol} at {head} -> write {}, {:?}, q{}",
            transition.write, transition.direction, transition.next_state
        );

        if self.tape.set(head, transition.write).is_err() {
            return Step::Halt(Halt::OutOfBounds { head, state });
        }
        events.push(Event::CellChanged {
            index: head,
            symbol: transition.write,
        });

        let next_head = match transition.direction {
            Direction::Halt => return Step::Halt(Halt::Rule),
            Direction::Left if head == 0 => {
                // Searching a for a mark to borrow and finding none: a < b.
                if program == Program::Subtraction && state == BORROW_STATE {
                    info!("negative result detected, erasing tape");
                    self.machine.state = ERASE_STATE;
                    self.machine.head = head + 1;
                    events.push(Event::HeadMoved {
                        index: self.machine.head,
                    });
                    return Step::Continue;
                }
                return Step::Halt(Halt::AtStart);
            }
            Direction::Left => head - 1,
            Direction::Right => head + 1,
        };

        self.machine.head = next_head;
        self.machine.state = transition.next_state;
        events.push(Event::HeadMoved { index: next_head });

        Step::Continue
    }

    /// Starts a run and steps it to completion, forwarding every event to `observer`.
    ///
    /// The observer first sees the head placed on cell 0, then the effects of each step in order.
    pub fn run_to_halt<O: Observer + ?Sized>(
        &mut self,
        observer: &mut O,
    ) -> Result<Halt, MachineError> {
        self.run()?;
        observer.on_head_moved(self.machine.head);

        loop {
            let result = self.step();
            for event in &result.events {
                event.notify(observer);
            }

            match result.step {
                Step::Continue => continue,
                Step::Halt(halt) => return Ok(halt),
                Step::Idle => return Err(MachineError::NoProgramSelected),
            }
        }
    }

    /// Writes a symbol into a cell while the machine is idle.
    pub fn write_cell(&mut self, index: usize, symbol: Symbol) -> Result<(), MachineError> {
        self.ensure_idle("edit tape")?;
        self.tape.set(index, symbol)
    }

    /// Advances a cell to its next symbol while the machine is idle and returns the new value.
    pub fn toggle_cell(&mut self, index: usize) -> Result<Symbol, MachineError> {
        self.ensure_idle("edit tape")?;
        self.tape.cycle(index)
    }

    /// Replaces the whole tape while the machine is idle. The tape length cannot change.
    pub fn load_tape(&mut self, tape: Tape) -> Result<(), MachineError> {
        self.ensure_idle("load tape")?;
        if tape.len() != self.tape.len() {
            return Err(MachineError::TapeLengthMismatch {
                expected: self.tape.len(),
                actual: tape.len(),
            });
        }
        self.tape = tape;
        Ok(())
    }

    fn ensure_idle(&self, command: &str) -> Result<(), MachineError> {
        if self.machine.running {
            warn!("{command} rejected: a run is in progress");
            return Err(MachineError::AlreadyRunning);
        }
        Ok(())
    }

    /// Returns the tape.
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Returns a copy of the run state.
    pub fn machine_state(&self) -> MachineState {
        self.machine
    }

    /// Returns the current head position.
    pub fn head(&self) -> usize {
        self.machine.head
    }

    /// Returns the current control state.
    pub fn state(&self) -> StateId {
        self.machine.state
    }

    pub fn is_running(&self) -> bool {
        self.machine.running
    }

    pub fn selected_program(&self) -> Option<Program> {
        self.machine.selected_program
    }

    /// Returns the number of steps executed by the current or last run.
    pub fn step_count(&self) -> usize {
        self.step_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(tape: &str, program: Program) -> TuringMachine {
        let mut machine = TuringMachine::new(tape.parse().unwrap());
        machine.select_program(program).unwrap();
        machine
    }

    fn run(tape: &str, program: Program) -> (TuringMachine, Halt) {
        let mut machine = machine(tape, program);
        let mut events: Vec<Event> = Vec::new();
        let halt = machine.run_to_halt(&mut events).unwrap();
        (machine, halt)
    }

    #[test]
    fn test_addition_two_plus_one() {
        let (machine, halt) = run("11210", Program::Addition);

        assert_eq!(halt, Halt::AtStart);
        assert_eq!(machine.tape().to_string(), "11100");
        assert_eq!(machine.tape().unary_value(), 3);
        assert!(!machine.is_running());
    }

    #[test]
    fn test_subtraction_two_minus_one() {
        let (machine, halt) = run("11210", Program::Subtraction);

        assert_eq!(halt, Halt::AtStart);
        assert_eq!(machine.tape().to_string(), "10000");
        assert_eq!(machine.tape().unary_value(), 1);
    }

    #[test]
    fn test_subtraction_negative_result_clears_tape() {
        let (machine, halt) = run("12110", Program::Subtraction);

        assert_eq!(halt, Halt::NegativeCleanupComplete);
        assert!(machine.tape().is_blank());
        assert_eq!(machine.state(), ERASE_STATE);
        assert_eq!(machine.head(), 5);
    }

    #[test]
    fn test_addition_of_zeros() {
        let (machine, halt) = run("02000", Program::Addition);

        assert!(halt.is_success());
        assert_eq!(halt, Halt::Rule);
        assert_eq!(machine.tape().to_string(), "00000");
    }

    #[test]
    fn test_addition_matches_arithmetic() {
        for a in 0..=5 {
            for b in 0..=5 {
                let len = Tape::required_len(a, b).unwrap() + 1;
                let mut machine = TuringMachine::new(Tape::from_operands(a, b, len).unwrap());
                machine.select_program(Program::Addition).unwrap();

                let halt = machine.run_to_halt(&mut Vec::<Event>::new()).unwrap();
                assert!(halt.is_success(), "{a} + {b} halted with {halt:?}");
                assert_eq!(machine.tape().unary_value(), a + b, "{a} + {b}");
                if a > 0 {
                    assert_eq!(halt, Halt::AtStart, "{a} + {b}");
                }
            }
        }
    }

    #[test]
    fn test_subtraction_matches_arithmetic() {
        for a in 0..=5 {
            for b in 0..=5 {
                let len = Tape::required_len(a, b).unwrap() + 1;
                let mut machine = TuringMachine::new(Tape::from_operands(a, b, len).unwrap());
                machine.select_program(Program::Subtraction).unwrap();

                let halt = machine.run_to_halt(&mut Vec::<Event>::new()).unwrap();
                match Program::Subtraction.apply(a, b) {
                    Some(difference) => {
                        assert_eq!(halt, Halt::AtStart, "{a} - {b}");
                        assert_eq!(machine.tape().unary_value(), difference, "{a} - {b}");
                    }
                    None => {
                        assert_eq!(halt, Halt::NegativeCleanupComplete, "{a} - {b}");
                        assert!(machine.tape().is_blank(), "{a} - {b}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_step_emits_write_before_move() {
        let mut machine = machine("11210", Program::Addition);
        machine.run().unwrap();

        let result = machine.step();
        assert_eq!(result.step, Step::Continue);
        assert_eq!(
            result.events,
            vec![
                Event::CellChanged {
                    index: 0,
                    symbol: Symbol::Mark
                },
                Event::HeadMoved { index: 1 },
            ]
        );
        assert_eq!(machine.state(), 1);
        assert_eq!(machine.step_count(), 1);
    }

    #[test]
    fn test_negative_bounce_moves_head_to_cell_one() {
        let mut machine = machine("12110", Program::Subtraction);
        machine.run().unwrap();

        let bounce = loop {
            let result = machine.step();
            assert_eq!(result.step, Step::Continue);
            if machine.state() == ERASE_STATE {
                break result;
            }
        };

        assert_eq!(machine.head(), 1);
        assert_eq!(
            bounce.events,
            vec![
                Event::CellChanged {
                    index: 0,
                    symbol: Symbol::Blank
                },
                Event::HeadMoved { index: 1 },
            ]
        );
    }

    #[test]
    fn test_halted_event_is_last_and_unique() {
        let mut machine = machine("12110", Program::Subtraction);
        let mut events: Vec<Event> = Vec::new();
        machine.run_to_halt(&mut events).unwrap();

        assert_eq!(events.first(), Some(&Event::HeadMoved { index: 0 }));
        assert_eq!(
            events.last(),
            Some(&Event::Halted(Halt::NegativeCleanupComplete))
        );
        let halts = events
            .iter()
            .filter(|e| matches!(e, Event::Halted(_)))
            .count();
        assert_eq!(halts, 1);
    }

    #[test]
    fn test_out_of_bounds_without_trailing_blank() {
        let (machine, halt) = run("1121", Program::Addition);

        assert_eq!(halt, Halt::OutOfBounds { head: 4, state: 2 });
        assert!(halt.is_fatal());
        assert!(!machine.is_running());
        assert_eq!(machine.tape().to_string(), "1111");
    }

    #[test]
    fn test_no_rule_halt() {
        let (machine, halt) = run("2200", Program::Addition);

        assert_eq!(
            halt,
            Halt::NoRule {
                state: 2,
                symbol: Symbol::Separator
            }
        );
        assert!(!halt.is_fatal());
        assert_eq!(machine.tape().to_string(), "1200");
    }

    #[test]
    fn test_empty_tape_is_out_of_bounds() {
        let (_, halt) = run("", Program::Subtraction);
        assert_eq!(halt, Halt::OutOfBounds { head: 0, state: 0 });
    }

    #[test]
    fn test_run_without_program() {
        let mut machine = TuringMachine::new("11210".parse().unwrap());

        assert_eq!(machine.run(), Err(MachineError::NoProgramSelected));
        assert!(!machine.is_running());
        assert_eq!(machine.step().step, Step::Idle);
    }

    #[test]
    fn test_run_twice_is_rejected() {
        let mut machine = machine("11210", Program::Addition);
        machine.run().unwrap();
        machine.step();
        machine.step();
        let before = machine.machine_state();

        assert_eq!(machine.run(), Err(MachineError::AlreadyRunning));
        assert_eq!(machine.machine_state(), before);
        assert_eq!(machine.step_count(), 2);
    }

    #[test]
    fn test_commands_rejected_while_running() {
        let mut machine = machine("11210", Program::Addition);
        machine.run().unwrap();

        assert_eq!(
            machine.select_program(Program::Subtraction),
            Err(MachineError::AlreadyRunning)
        );
        assert_eq!(machine.selected_program(), Some(Program::Addition));
        assert_eq!(machine.toggle_cell(4), Err(MachineError::AlreadyRunning));
        assert_eq!(
            machine.write_cell(4, Symbol::Mark),
            Err(MachineError::AlreadyRunning)
        );
        assert_eq!(machine.tape().to_string(), "11210");
    }

    #[test]
    fn test_reset_before_run() {
        let mut machine = machine("11210", Program::Addition);
        machine.reset();

        assert_eq!(machine.machine_state(), MachineState::default());
        assert!(machine.tape().is_blank());
        assert_eq!(machine.tape().len(), 5);
    }

    #[test]
    fn test_reset_mid_run_cancels() {
        let mut machine = machine("12110", Program::Subtraction);
        machine.run().unwrap();
        for _ in 0..7 {
            machine.step();
        }
        assert!(machine.is_running());

        machine.reset();

        assert_eq!(
            machine.machine_state(),
            MachineState {
                head: 0,
                state: 0,
                running: false,
                selected_program: None,
            }
        );
        assert!(machine.tape().is_blank());
        assert_eq!(machine.step(), StepResult::idle());
        assert_eq!(machine.run(), Err(MachineError::NoProgramSelected));
    }

    #[test]
    fn test_run_uses_program_selected_at_start() {
        let mut machine = machine("12110", Program::Subtraction);
        machine.run().unwrap();
        machine.step();
        machine.machine.selected_program = None;

        let mut halt = None;
        for _ in 0..100 {
            if let Step::Halt(h) = machine.step().step {
                halt = Some(h);
                break;
            }
        }

        assert_eq!(halt, Some(Halt::NegativeCleanupComplete));
        assert!(!machine.is_running());
        assert!(machine.tape().is_blank());
    }

    #[test]
    fn test_step_without_active_program_stops_running() {
        let mut machine = machine("11210", Program::Addition);
        machine.run().unwrap();
        machine.active = None;

        assert_eq!(machine.step(), StepResult::idle());
        assert!(!machine.is_running());
        assert!(machine.run().is_ok());
    }

    #[test]
    fn test_reset_after_fatal_halt() {
        let (mut machine, halt) = run("1121", Program::Addition);
        assert!(halt.is_fatal());

        machine.reset();
        assert!(machine.tape().is_blank());
        assert_eq!(machine.machine_state(), MachineState::default());
    }

    #[test]
    fn test_rerun_after_halt() {
        let (mut machine, _) = run("11210", Program::Addition);

        machine.load_tape("12110".parse().unwrap()).unwrap();
        machine.select_program(Program::Subtraction).unwrap();
        let halt = machine.run_to_halt(&mut Vec::<Event>::new()).unwrap();

        assert_eq!(halt, Halt::NegativeCleanupComplete);
    }

    #[test]
    fn test_edit_tape_when_idle() {
        let mut machine = TuringMachine::new(Tape::blank(5));

        assert_eq!(machine.toggle_cell(0), Ok(Symbol::Mark));
        assert_eq!(machine.toggle_cell(1), Ok(Symbol::Mark));
        machine.write_cell(2, Symbol::Separator).unwrap();
        machine.write_cell(3, Symbol::Mark).unwrap();
        assert_eq!(
            machine.write_cell(5, Symbol::Mark),
            Err(MachineError::IndexOutOfBounds { index: 5, len: 5 })
        );
        assert_eq!(machine.tape().to_string(), "11210");

        assert_eq!(
            machine.load_tape(Tape::blank(3)),
            Err(MachineError::TapeLengthMismatch {
                expected: 5,
                actual: 3
            })
        );
    }

    #[test]
    fn test_from_config_preselects_program() {
        let config = MachineConfig {
            name: "two plus one".to_string(),
            program: Some(Program::Addition),
            tape: "11210".parse().unwrap(),
            pace_ms: 0,
        };

        let mut machine = TuringMachine::from_config(&config);
        assert_eq!(machine.selected_program(), Some(Program::Addition));
        assert_eq!(machine.run_to_halt(&mut Vec::<Event>::new()), Ok(Halt::AtStart));
    }
}
