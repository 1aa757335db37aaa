//! Runs a command script against an in-memory world.
//!
//! # Usage
//! ```text
//! opchain <script> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `script`: assembly text or binary script produced by `opchain-asm`
//!
//! # Options
//! - `--caller <0xaddr>`: account the run is made on behalf of
//! - `--executor <0xaddr>`: account the commands execute as
//! - `--value <amount>`: value credited from caller to executor before the run;
//!   the caller is funded with it first
//! - `--output <file>`: also write the final state there, one hex slot per line
//!
//! Every library contract is deployed and usable as `@alias` in the script.
//! The log level is read from `OPCHAIN_LOG` (`debug`, `info`, `warn`, `error`).

use opchain::contracts::{LIBRARY, library_address, library_context, library_world};
use opchain::types::address::Address;
use opchain::types::hex;
use opchain::types::word::Word;
use opchain::virtual_machine::script::Script;
use opchain::{error, info};
use std::env;
use std::fs;
use std::process;

const DEFAULT_CALLER: Address = Address::from_low_u8(0x01);
const DEFAULT_EXECUTOR: Address = Address::from_low_u8(0x02);

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let script_path = &args[1];
    let mut caller = DEFAULT_CALLER;
    let mut executor = DEFAULT_EXECUTOR;
    let mut value = Word::zero();
    let mut output_path: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        if !matches!(flag, "--caller" | "--executor" | "--value" | "--output") {
            error!("Unexpected argument: {flag}\n");
            print_usage(&args[0]);
            process::exit(1);
        }
        i += 1;
        let Some(arg) = args.get(i) else {
            error!("{flag} requires an argument");
            process::exit(1);
        };
        match flag {
            "--caller" => caller = parse_address(flag, arg),
            "--executor" => executor = parse_address(flag, arg),
            "--value" => {
                value = arg.parse::<u128>().map(Word::from_u128).unwrap_or_else(|_| {
                    error!("Invalid value: '{arg}' is not a valid amount");
                    process::exit(1);
                })
            }
            _ => output_path = Some(arg.clone()),
        }
        i += 1;
    }

    let script = Script::load(script_path, library_context()).unwrap_or_else(|e| {
        error!("Failed to load {script_path}: {e}");
        process::exit(1);
    });

    let mut world = library_world();
    if !value.is_zero() {
        world.set_balance(caller, value);
    }

    info!(
        "Running {} commands over {} slots as {executor}",
        script.commands.len(),
        script.state.len()
    );

    let state = match world.execute(caller, executor, &script.commands, script.state, value) {
        Ok(state) => state,
        Err(e) => {
            error!("Run failed: {e}");
            process::exit(2);
        }
    };

    for (i, slot) in state.iter().enumerate() {
        println!("s{i:<3} 0x{}", hex::encode(slot));
    }

    for log in world.logs() {
        let source = LIBRARY
            .iter()
            .find(|alias| library_address(alias) == log.address)
            .map(|alias| format!("@{alias}"))
            .unwrap_or_else(|| log.address.to_string());
        println!("event {} from {source}: 0x{}", log.name, hex::encode(&log.data));
    }

    if let Some(path) = output_path {
        let text: String = state
            .iter()
            .map(|slot| format!("0x{}\n", hex::encode(slot)))
            .collect();
        if let Err(e) = fs::write(&path, text) {
            error!("Failed to write {path}: {e}");
            process::exit(1);
        }
        info!("Final state written to {path}");
    }
}

fn parse_address(flag: &str, text: &str) -> Address {
    text.parse().unwrap_or_else(|e: String| {
        error!("{flag}: {e}");
        process::exit(1);
    })
}

const USAGE: &str = "\
Command Script Runner

USAGE:
    {program} <script> [OPTIONS]

ARGS:
    <script>    Assembly text or binary script

OPTIONS:
    --caller <0xaddr>      Account the run is made on behalf of
    --executor <0xaddr>    Account the commands execute as
    --value <amount>       Value sent from caller to executor (caller is funded with it)
    --output <file>        Write the final state to a file
    -h, --help             Print this help message

ENVIRONMENT:
    OPCHAIN_LOG            Minimum log level: debug, info, warn, error

EXAMPLES:
    {program} fib.asm
    {program} fib.opc --value 1000 --output state.txt
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
