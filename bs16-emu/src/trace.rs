use std::io::{self, BufRead, Write};

use console::{style, Emoji};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};

use bs16_sim::{Engine, Trace};
use bs16_sim::processor::microcode::MicroInstruction;

use crate::cli::RunMode;
use crate::dump::{self, MemoryFilter};

/// Last micro-address of the instruction fetch prologue.
const PROLOGUE_END: u16 = 2;

/// Waits for a line on `input`. Returns `false` once the input is exhausted.
pub fn wait_for_enter<R>(input: &mut R) -> io::Result<bool>
where
    R: BufRead
{
    Ok(input.read_line(&mut String::new())? > 0)
}

/// Interactive trace: prints every traced cycle and waits for ENTER before going on.
///
/// Tracing stops for the rest of the run once stdin is closed or the terminal cannot be driven.
pub struct ConsoleTrace {
    mode: RunMode,
    traced: bool,
    stopped: bool
}
impl ConsoleTrace {
    pub fn new(mode: RunMode) -> Self {
        ConsoleTrace { mode, traced: false, stopped: false }
    }

    pub fn traces(&self, micro_address: u16) -> bool {
        if self.stopped {
            return false;
        }
        match self.mode {
            RunMode::Run => false,
            RunMode::Debug => micro_address > PROLOGUE_END,
            RunMode::FullDebug => true
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn stop<S>(&mut self, reason: S)
    where
        S: AsRef<str>
    {
        if !self.stopped {
            println!(
                "{} {} {}, tracing stopped",
                Emoji("⚠️", "⚠"),
                style("Warning:").bright().yellow(),
                reason.as_ref()
            );
            self.stopped = true;
        }
    }

    pub fn memory_filter(&self, engine: &Engine) -> MemoryFilter {
        match self.mode {
            RunMode::FullDebug => MemoryFilter::All,
            _ => MemoryFilter::AfterProgram(engine.last_program_address())
        }
    }

    fn pause(&mut self) {
        let mut stdout = io::stdout();
        print!("Press ENTER to continue...");
        let result = stdout.flush()
            .and_then(|_| wait_for_enter(&mut io::stdin().lock()))
            .and_then(|more| {
                if more {
                    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0)).map(|_| true)
                } else {
                    Ok(false)
                }
            });
        match result {
            Ok(true) => {},
            Ok(false) => {
                println!();
                self.stop("stdin is closed");
            },
            Err(error) => {
                println!();
                self.stop(format!("terminal error: {}", error));
            }
        }
    }
}
impl Trace for ConsoleTrace {
    fn before_cycle(&mut self, _engine: &Engine, micro_address: u16, instruction: &MicroInstruction) {
        self.traced = self.traces(micro_address);
        if self.traced {
            println!(
                "{} {:#05X}",
                style("Evaluating micro-instruction at").cyan().bright(),
                micro_address
            );
            print!("{}", dump::micro_instruction(instruction));
            println!();
        }
    }

    fn after_cycle(&mut self, engine: &Engine, _micro_address: u16) {
        if self.traced {
            println!("{}", style("State after the cycle").cyan().bright());
            print!("{}", dump::snapshot(&engine.snapshot(), self.memory_filter(engine)));
            self.pause();
        }
    }
}
