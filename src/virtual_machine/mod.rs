//! Command engine: decoding, argument building, dispatch and result writing.
//!
//! A program is a list of 32-byte [`command::Command`]s and an initial state
//! vector of byte slots. The [`vm::VM`] validates the whole list up front, then
//! executes it in order against a [`dispatch::Host`]; the first failing call
//! aborts the run with the callee's payload.
//!
//! # Modules
//!
//! - [`abi`]: head/tail value encoding of call inputs and returns
//! - [`command`]: command layout, flags and index sentinels
//! - [`inputs`]: builds a command's call data from the state
//! - [`dispatch`]: call kinds and the host interface
//! - [`outputs`]: writes return data back into the state
//! - [`verifier`]: pre-flight slot reference checks
//! - [`vm`]: the execution loop
//! - [`errors`]: engine, assembler and script errors
//! - [`script`]: binary script format
//! - [`assembler`]: text assembler, diagnostics and disassembler

pub mod abi;
pub mod assembler;
pub mod command;
pub mod dispatch;
pub mod errors;
pub mod inputs;
pub mod outputs;
pub mod script;
pub mod verifier;
pub mod vm;
