//! In-memory host for the command engine.
//!
//! A [`world::World`] holds accounts with native [`contract::Contract`] code,
//! per-account storage and balances, and an event log. Every call runs in its
//! own [`env::CallEnv`] frame over an overlay of its parent's storage, so a
//! failed call leaves no trace and a failed run leaves the world untouched.
//!
//! # Modules
//!
//! - [`state`]: storage trait, overlay write buffer and in-memory store
//! - [`env`]: call frames, call-kind semantics and the contract environment
//! - [`contract`]: the native contract trait and calldata helpers
//! - [`world`]: accounts, deployment and command-list execution

pub mod contract;
pub mod env;
pub mod state;
pub mod world;
