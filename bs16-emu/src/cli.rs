pub mod utils;

pub use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use bs16_sim::DEFAULT_STEP_LIMIT;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RunMode {
    /// No output until the machine stops.
    Run,
    /// Traces every cycle except the instruction fetch prologue.
    Debug,
    /// Traces every cycle.
    FullDebug
}
impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase()[..] {
            "run" => Ok(RunMode::Run),
            "debug" => Ok(RunMode::Debug),
            "full-debug" | "full_debug" => Ok(RunMode::FullDebug),
            _ => Err(format!("unknown mode `{}`, expected one of `run`, `debug`, `full-debug`", s))
        }
    }
}

pub enum Mode {
    Check {
        microcode: Option<PathBuf>
    },
    Execute {
        program: PathBuf,
        microcode: Option<PathBuf>,
        run_mode: RunMode,
        step_limit: u64
    }
}

/// Runs bs16 macro programs on the microprogrammed bit-slice machine.
#[derive(Parser)]
#[clap(version)]
pub struct Options {
    /// Macro assembly program to run.
    #[clap(required_unless_present("check"))]
    program: Option<PathBuf>,
    /// Execution mode: `run`, `debug` or `full-debug`.
    ///
    /// `debug` pauses after every cycle outside of the instruction fetch, `full-debug` after
    /// every cycle.
    #[clap(long, default_value = "run")]
    mode: RunMode,
    /// Microprogram to load instead of the bundled reference one.
    #[clap(short, long)]
    microcode: Option<PathBuf>,
    /// Number of microcycles after which the run is abandoned.
    #[clap(long, default_value_t = DEFAULT_STEP_LIMIT)]
    step_limit: u64,
    /// Prints more information; can be repeated.
    #[clap(short, long, parse(from_occurrences))]
    verbose: u64,
    /// Checks the microprogram for dangling references and exits.
    #[clap(long)]
    check: bool
}

impl Options {
    pub fn from_command_line() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> u64 {
        self.verbose
    }

    pub fn into_mode(self) -> Mode {
        match self.program {
            Some(program) if !self.check => Mode::Execute {
                program,
                microcode: self.microcode,
                run_mode: self.mode,
                step_limit: self.step_limit
            },
            _ => Mode::Check { microcode: self.microcode }
        }
    }
}
