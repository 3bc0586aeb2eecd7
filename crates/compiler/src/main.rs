//! Mila compiler CLI.
//!
//! Reads Mila source (standard input by default), compiles it, and prints
//! the LLVM IR module on standard output. Errors are printed and the
//! process exits with code 1; nothing is recovered past the first
//! diagnostic.

use clap::Parser as ClapParser;
use milac::CompilerConfig;
use std::fs;
use std::io::{self, Read as _};
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "milac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mila compiler - compile Mila source to LLVM IR", long_about = None)]
struct Cli {
    /// Input source file; reads standard input when absent or "-"
    input: Option<PathBuf>,

    /// Write the IR here instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with compiler overrides
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let config = match &cli.config {
        Some(path) => match CompilerConfig::load(path) {
            Ok(config) => config,
            Err(message) => {
                println!("{}", message);
                return 1;
            }
        },
        None => CompilerConfig::default(),
    };

    let source = match read_source(cli.input.as_deref()) {
        Ok(source) => source,
        Err(e) => {
            println!("Failed to read source: {}", e);
            return 1;
        }
    };

    match milac::compile_to_ir_with_config(&source, &config) {
        Ok(ir) => match &cli.output {
            Some(path) => {
                if let Err(e) = fs::write(path, &ir) {
                    println!("Failed to write '{}': {}", path.display(), e);
                    return 1;
                }
                0
            }
            None => {
                print!("{}", ir);
                0
            }
        },
        Err(message) => {
            println!("Error during parsing:");
            println!("{}", message);
            1
        }
    }
}

fn read_source(input: Option<&Path>) -> io::Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path),
        _ => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}
