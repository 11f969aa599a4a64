use clap::Parser;
use log::debug;
use std::error::Error;
use std::io::{self, Read};
use std::path::Path;
use std::process;
use std::thread;
use std::time::Duration;
use unary_tm::types::DEFAULT_PACE_MS;
use unary_tm::{
    analyze, ConfigLoader, Event, Halt, MachineConfig, MachineError, Observer, Program, Symbol, Tape,
    TuringMachine,
};

/// Runs unary addition and subtraction on a simulated Turing machine tape.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  unary-tm --tape '11|1_' --program addition
  unary-tm --operands 1 2 --program subtraction --pace 200
  cat demo.utm | unary-tm")]
struct Cli {
    /// Machine configuration file (.utm)
    #[clap(short, long, conflicts_with_all = ["tape", "operands"])]
    config: Option<String>,

    /// Initial tape, e.g. `11|1_` or `1,1,2,1,0`
    #[clap(short, long, conflicts_with = "operands")]
    tape: Option<String>,

    /// Two operands to encode in unary, e.g. `--operands 2 1`
    #[clap(short = 'n', long, num_args = 2, value_names = ["A", "B"])]
    operands: Option<Vec<usize>>,

    /// Tape length; pads the given tape or sizes the operand encoding
    #[clap(short, long)]
    length: Option<usize>,

    /// Program to run: addition (+) or subtraction (-)
    #[clap(short, long)]
    program: Option<String>,

    /// Delay in milliseconds between two observable effects
    #[clap(long)]
    pace: Option<u64>,

    /// Print events as JSON lines instead of tape snapshots
    #[clap(long)]
    json: bool,

    /// Only print the final tape
    #[clap(short, long)]
    quiet: bool,
}

/// Renders the run on stdout from the event stream alone, pausing after each effect.
struct Printer {
    cells: Vec<Symbol>,
    head: usize,
    pace: Duration,
    json: bool,
    quiet: bool,
}

impl Printer {
    fn new(tape: &Tape, pace: Duration, cli: &Cli) -> Self {
        Self {
            cells: tape.symbols().to_vec(),
            head: 0,
            pace,
            json: cli.json,
            quiet: cli.quiet,
        }
    }

    fn emit(&self, event: &Event) {
        if self.quiet {
            return;
        }

        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Failed to serialize event: {e}"),
            }
        } else if !matches!(event, Event::Halted(_)) {
            println!("{}", self.snapshot());
        }
    }

    /// The tape with the cell under the head in brackets.
    fn snapshot(&self) -> String {
        let mut line: String = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if i == self.head {
                    format!("[{s}]")
                } else {
                    format!(" {s} ")
                }
            })
            .collect();

        if self.head >= self.cells.len() {
            line.push_str("[ ]");
        }
        line
    }

    fn pause(&self) {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
    }
}

impl Observer for Printer {
    fn on_cell_changed(&mut self, index: usize, symbol: Symbol) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = symbol;
        }
        self.emit(&Event::CellChanged { index, symbol });
        self.pause();
    }

    fn on_head_moved(&mut self, index: usize) {
        self.head = index;
        self.emit(&Event::HeadMoved { index });
        self.pause();
    }

    fn on_halted(&mut self, halt: &Halt) {
        self.emit(&Event::Halted(halt.clone()));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    debug!("loaded configuration {:?}", config.name);

    let mut machine = TuringMachine::from_config(&config);
    if let Some(program) = &cli.program {
        machine.select_program(program.parse::<Program>()?)?;
    }

    let mut printer = Printer::new(machine.tape(), config.pace(), &cli);
    let halt = match machine.run_to_halt(&mut printer) {
        Ok(halt) => halt,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string(machine.tape())?);
    } else {
        if !cli.quiet {
            println!("\nMachine halted: {halt}");
        }
        println!("{}", machine.tape());
        if !cli.quiet && halt.is_success() {
            println!("Result: {}", machine.tape().unary_value());
        }
    }

    if halt.is_fatal() {
        process::exit(3);
    }

    Ok(())
}

/// Builds the machine configuration from CLI arguments.
///
/// It tries a configuration file, then an explicit tape or operands, and finally reads a
/// configuration piped through stdin. Every source is validated the same way.
fn load_config(cli: &Cli) -> Result<MachineConfig, MachineError> {
    let mut config = if let Some(path) = &cli.config {
        ConfigLoader::load_config(Path::new(path))?
    } else if let Some(tape) = &cli.tape {
        let mut tape: Vec<Symbol> = tape.parse::<Tape>()?.symbols().to_vec();
        if let Some(len) = cli.length {
            Tape::check_len(len)?;
            if len < tape.len() {
                return Err(MachineError::TapeLengthMismatch {
                    expected: len,
                    actual: tape.len(),
                });
            }
            tape.resize(len, Symbol::Blank);
        }
        inline_config(Tape::from_symbols(tape))
    } else if let Some(operands) = &cli.operands {
        let (a, b) = match operands.as_slice() {
            [a, b] => (*a, *b),
            _ => {
                return Err(MachineError::ValidationError(
                    "Expected exactly two operands".to_string(),
                ))
            }
        };
        let len = match cli.length {
            Some(len) => len,
            None => Tape::required_len(a, b)?,
        };
        inline_config(Tape::from_operands(a, b, len)?)
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| MachineError::FileError(format!("Failed to read from stdin: {}", e)))?;
        ConfigLoader::load_config_from_string(&buffer)?
    } else {
        return Err(MachineError::ValidationError(
            "Provide --config, --tape or --operands (see --help)".to_string(),
        ));
    };

    if let Some(pace) = cli.pace {
        config.pace_ms = pace;
    }

    analyze(&config)?;
    Ok(config)
}

fn inline_config(tape: Tape) -> MachineConfig {
    MachineConfig {
        name: "command line".to_string(),
        program: None,
        tape,
        pace_ms: DEFAULT_PACE_MS,
    }
}
