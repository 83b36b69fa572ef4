extern crate bs16_asm;

use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use console::{style, Emoji};

use bs16_asm::Assembly;

/// Assembles bs16 macro programs into big-endian 16-bit words.
#[derive(Parser)]
#[clap(version)]
struct Options {
    /// Source file to assemble.
    source: PathBuf,
    /// Writes the initial memory image into this file: the `memory:` cells with the program
    /// words over them, as big-endian 16-bit words from address 0.
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Prints the address, encoding and disassembly of every instruction.
    #[clap(long)]
    listing: bool
}

fn print_listing(assembly: &Assembly) {
    for entry in assembly.listing.iter() {
        let start = usize::from(entry.address);
        let words = assembly.program[start..start + entry.instruction.words().len()]
            .iter()
            .map(|word| format!("{:04X}", word))
            .collect::<Vec<_>>()
            .join(" ");
        let line = match entry.line {
            Some(line) => format!("{:>4}", line),
            None => String::from("   -")
        };
        println!("  {}  {:#06X}  {:<9}  {}", style(line).dim(), entry.address, words, entry.instruction);
    }
    if !assembly.memory.is_empty() {
        println!("  {}", style("memory:").cyan().bright());
        for (address, value) in assembly.memory.iter() {
            println!("        {:#06X}  {:04X}", address, value);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::parse();
    let start = Instant::now();

    println!("  {} `{}`", style("Assembling").green().bright(), options.source.display());
    let assembly = match Assembly::from_file(&options.source) {
        Ok(assembly) => assembly,
        Err(error) => {
            println!("{} {} {}", Emoji("❌", "X"), style("Error:").bright().red(), error);
            std::process::exit(1);
        }
    };

    if options.listing {
        print_listing(&assembly);
    }
    if let Some(ref output) = options.output {
        let mut file = File::create(output)?;
        file.write_all(&assembly.to_bytes())?;
    }

    let duration = Instant::now() - start;
    println!(
        "    {} {} word(s), {} memory cell(s) in {}.{:02}s",
        style("Finished").green().bright(),
        assembly.program.len(),
        assembly.memory.len(),
        duration.as_secs(),
        (duration.as_millis() / 10) % 100
    );

    Ok(())
}
