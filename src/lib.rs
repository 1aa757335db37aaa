//! Operation-chaining execution engine.
//!
//! Runs lists of 32-byte commands, each one an external call whose inputs
//! come from and whose result goes back into a shared vector of byte slots.
//! Ships with an in-memory host, a library of native contracts, and a text
//! assembler for writing command lists by hand.

pub mod contracts;
pub mod runtime;
pub mod types;
pub mod utils;
pub mod virtual_machine;
