//! Native contract library preloaded into a [`World`].
//!
//! Every library contract sits at a fixed address derived from its alias, so
//! scripts can refer to it as `@alias` in the assembler.

pub mod context;
pub mod events;
pub mod executor;
pub mod math;
pub mod strings;
pub mod token;
pub mod tuples;

use crate::runtime::contract::Contract;
use crate::runtime::world::World;
use crate::types::address::Address;
use crate::types::word::Word;
use crate::virtual_machine::assembler::AsmContext;

/// Aliases of every library contract, in deployment order.
pub const LIBRARY: [&str; 11] = [
    "math",
    "strings",
    "events",
    "sender",
    "payable",
    "revert",
    "state",
    "multireturn",
    "tupler",
    "token",
    "executor",
];

/// Address a library contract is deployed at.
pub fn library_address(alias: &str) -> Address {
    Word::keccak_concat(&[b"opchain.library.", alias.as_bytes()]).to_address()
}

/// Fresh instance of the library contract named `alias`.
pub fn instantiate(alias: &str) -> Option<Box<dyn Contract>> {
    let contract: Box<dyn Contract> = match alias {
        "math" => Box::new(math::Math),
        "strings" => Box::new(strings::Strings),
        "events" => Box::new(events::Events),
        "sender" => Box::new(context::Sender),
        "payable" => Box::new(context::Payable),
        "revert" => Box::new(context::Revert),
        "state" => Box::new(tuples::StateTest),
        "multireturn" => Box::new(tuples::MultiReturn),
        "tupler" => Box::new(tuples::Tupler),
        "token" => Box::new(token::Token),
        "executor" => Box::new(executor::Executor),
        _ => return None,
    };
    Some(contract)
}

/// Deploys every library contract into `world`.
pub fn deploy_library(world: &mut World) {
    for alias in LIBRARY {
        if let Some(contract) = instantiate(alias) {
            world.deploy_boxed(library_address(alias), contract);
        }
    }
}

/// Assembler context resolving `@alias` to every library contract.
pub fn library_context() -> AsmContext {
    AsmContext::with_aliases(LIBRARY.map(|alias| (alias, library_address(alias))))
}

/// A world with the whole library deployed.
pub fn library_world() -> World {
    let mut world = World::new();
    deploy_library(&mut world);
    world
}
