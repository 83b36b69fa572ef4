extern crate bs16_emu;

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use console::{style, Emoji};

use bs16_asm::{Assembly, Microprogram};
use bs16_sim::RunOutcome;

use bs16_emu::cli::{Mode, Options, RunMode};
use bs16_emu::cli::utils::Spinner;
use bs16_emu::dump::{self, MemoryFilter};
use bs16_emu::reference;
use bs16_emu::trace::ConsoleTrace;

fn fail<E: Error>(error: E) -> ! {
    println!("{} {} {}", Emoji("❌", "X"), style("Error:").bright().red(), error);
    std::process::exit(1);
}

fn load_microprogram(microcode: &Option<PathBuf>, verbose: u64) -> Microprogram {
    let microprogram = match microcode {
        Some(path) => {
            if verbose > 0 {
                println!("{} {} `{}`", Emoji("ℹ️", "ℹ"), style("Microcode:").bright().cyan(), path.display());
            }
            Microprogram::from_file(path)
        },
        None => {
            if verbose > 0 {
                println!("{} {} bundled reference", Emoji("ℹ️", "ℹ"), style("Microcode:").bright().cyan());
            }
            reference::reference_microprogram()
        }
    };
    let microprogram = microprogram.unwrap_or_else(|e| fail(e));
    if verbose > 1 {
        println!(
            "    {} control word(s), {} PROM entr(ies)",
            microprogram.control_store.len(),
            microprogram.mapping_prom.len()
        );
    }
    microprogram
}

/// Prints every consistency issue of `microprogram` as a warning and returns how many there were.
fn report_issues(microprogram: &Microprogram) -> usize {
    let issues = microprogram.control_store.validate(&microprogram.mapping_prom);
    for issue in issues.iter() {
        println!("{} {} {}", Emoji("⚠️", "⚠"), style("Warning:").bright().yellow(), issue);
    }
    issues.len()
}

fn check(microcode: Option<PathBuf>, verbose: u64) {
    let microprogram = load_microprogram(&microcode, verbose);
    if report_issues(&microprogram) > 0 {
        std::process::exit(1);
    }
    println!("{} {}", Emoji("✔️", "✔"), style("Microprogram is consistent").bright().green());
}

fn execute(program: PathBuf, microcode: Option<PathBuf>, run_mode: RunMode, step_limit: u64, verbose: u64) {
    let start = Instant::now();
    let microprogram = load_microprogram(&microcode, verbose);
    report_issues(&microprogram);

    println!("  {} `{}`", style("Assembling").green().bright(), program.display());
    let assembly = Assembly::from_file(&program).unwrap_or_else(|e| fail(e));
    if verbose > 0 {
        println!(
            "{} {} {} word(s), {} memory cell(s)",
            Emoji("ℹ️", "ℹ"),
            style("Program:").bright().cyan(),
            assembly.program.len(),
            assembly.memory.len()
        );
    }

    let mut engine = reference::engine(microprogram, step_limit);
    engine.load_memory(assembly.memory.iter().map(|(&address, &value)| (address, value)));
    engine.load_program(&assembly.program).unwrap_or_else(|e| fail(e));

    let filter = match run_mode {
        RunMode::FullDebug => MemoryFilter::All,
        _ => MemoryFilter::AfterProgram(engine.last_program_address())
    };
    println!("   {} `{}`", style("Running").green().bright(), program.display());
    let result = match run_mode {
        RunMode::Run => {
            let spinner = Spinner::spawn("Executing microcycles...");
            let result = engine.run();
            spinner.finish();
            result
        },
        RunMode::Debug | RunMode::FullDebug => engine.run_traced(&mut ConsoleTrace::new(run_mode))
    };

    let duration = Instant::now() - start;
    match result {
        Ok(RunOutcome::Halted(snapshot)) => {
            print!("{}", dump::snapshot(&snapshot, filter));
            println!(
                "    {} in {} cycle(s), {}.{:02}s",
                style("Halted").green().bright(),
                snapshot.cycles,
                duration.as_secs(),
                (duration.as_millis() / 10) % 100
            );
        },
        Ok(RunOutcome::StepLimitExceeded(snapshot)) => {
            print!("{}", dump::snapshot(&snapshot, filter));
            println!(
                "{} {} the machine did not halt within {} cycle(s)",
                Emoji("⚠️", "⚠"),
                style("Warning:").bright().yellow(),
                snapshot.cycles
            );
            std::process::exit(2);
        },
        Err(error) => {
            print!("{}", dump::snapshot(&engine.snapshot(), filter));
            fail(error);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::from_command_line();
    let verbose = options.verbose();

    match options.into_mode() {
        Mode::Check { microcode } => check(microcode, verbose),
        Mode::Execute { program, microcode, run_mode, step_limit } =>
            execute(program, microcode, run_mode, step_limit, verbose)
    }

    Ok(())
}
