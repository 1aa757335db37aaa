//! Command script assembler CLI.
//!
//! Reads assembly text and writes the binary script format, or turns a binary
//! script back into text.
//!
//! # Usage
//! ```text
//! opchain-asm <input> [OPTIONS]
//! ```
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.opc`, or
//!   stdout when disassembling)
//! - `-d, --disassemble`: Read a binary script and print assembly text
//!
//! Library contracts are available as `@alias` targets in both directions.

use opchain::contracts::library_context;
use opchain::virtual_machine::assembler::{assemble_file, disassemble};
use opchain::virtual_machine::script::Script;
use opchain::{error, info};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut disassemble_mode = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            "--disassemble" | "-d" => {
                disassemble_mode = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    if disassemble_mode {
        run_disassemble(input_path, output_path.as_deref());
    } else {
        run_assemble(input_path, output_path);
    }
}

fn run_assemble(input_path: &str, output_path: Option<String>) {
    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.opc", stem))
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    let script = match assemble_file(input_path, library_context()) {
        Ok(s) => s,
        Err(e) => {
            error!("Assembly failed: {}", e);
            process::exit(1);
        }
    };

    let bytes = script.to_bytes();
    if let Err(e) = fs::write(&output_path, &bytes) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Assembled {} -> {} ({} commands, {} slots, {} bytes)",
        input_path,
        output_path,
        script.commands.len(),
        script.state.len(),
        bytes.len()
    );
}

fn run_disassemble(input_path: &str, output_path: Option<&str>) {
    let data = fs::read(input_path).unwrap_or_else(|e| {
        error!("Failed to read {input_path}: {e}");
        process::exit(1);
    });

    let text = Script::from_bytes(&data)
        .and_then(|script| disassemble(&script, &library_context()))
        .unwrap_or_else(|e| {
            error!("Disassembly failed: {e}");
            process::exit(1);
        });

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &text) {
                error!("Failed to write output file: {}", e);
                process::exit(1);
            }
            info!("Disassembled {input_path} -> {path}");
        }
        None => print!("{text}"),
    }
}

const USAGE: &str = "\
Command Script Assembler

USAGE:
    {program} <input> [OPTIONS]

ARGS:
    <input>    Assembly source (or binary script with --disassemble)

OPTIONS:
    -o, --output <file>     Output file path (defaults to <input>.opc)
    -d, --disassemble       Print a binary script as assembly text
    -h, --help              Print this help message

EXAMPLES:
    # Assemble to default output name
    {program} fib.asm

    # Assemble with explicit output
    {program} fib.asm -o fib.opc

    # Show what a binary script does
    {program} fib.opc -d
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
