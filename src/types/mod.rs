//! Core type definitions shared by the engine and its host.
//!
//! - `Word`: the 32-byte value every static slot holds
//! - `Address`: 20-byte account identifier used as a call target
//! - `encoding`: little-endian binary codec for script files
//! - `hex`: hex text helpers for CLI and assembler input

pub mod address;
pub mod encoding;
pub mod hex;
pub mod word;
