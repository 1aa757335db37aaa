//! An in-memory chain of accounts that command lists run against.

use crate::runtime::contract::Contract;
use crate::runtime::env::{self, CallEnv, Contracts, Frame, Log};
use crate::runtime::state::{MemoryState, OverlayState, State};
use crate::types::address::Address;
use crate::types::word::Word;
use crate::virtual_machine::dispatch::{CallKind, CallOutcome, Message};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm;
use crate::{info, warn};

/// Accounts, their code, storage and balances, and the event log.
#[derive(Default)]
pub struct World {
    state: MemoryState,
    contracts: Contracts,
    logs: Vec<Log>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `contract` at `address`, replacing any previous code.
    pub fn deploy(&mut self, address: Address, contract: impl Contract + 'static) {
        self.deploy_boxed(address, Box::new(contract));
    }

    pub fn deploy_boxed(&mut self, address: Address, contract: Box<dyn Contract>) {
        info!("deployed {} at {address}", contract.name());
        self.contracts.insert(address, contract);
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.contracts.contains_key(&address)
    }

    /// Name of the contract at `address`, if any.
    pub fn code_name(&self, address: Address) -> Option<&'static str> {
        self.contracts.get(&address).map(|c| c.name())
    }

    pub fn balance(&self, account: Address) -> Word {
        env::balance_of(&self.state, account)
    }

    pub fn set_balance(&mut self, account: Address, amount: Word) {
        env::set_balance(&mut self.state, account, amount);
    }

    /// Word `key` of `account`'s storage.
    pub fn storage(&self, account: Address, key: Word) -> Word {
        self.state
            .get(env::storage_key(account, key))
            .and_then(|v| Word::from_slice(&v))
            .unwrap_or_default()
    }

    /// Events of every committed call and run, oldest first.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Sends a single message from `caller`, outside of any command list.
    pub fn call(&mut self, caller: Address, msg: Message<'_>) -> CallOutcome {
        let root = Frame::root(caller, caller, Word::zero());
        env::dispatch(
            &mut self.state,
            &self.contracts,
            &mut self.logs,
            &root,
            1,
            msg,
        )
    }

    /// Runs a command list as account `executor` on behalf of `caller`.
    ///
    /// `value` is credited from `caller` to `executor` first and is visible to
    /// delegated commands as the frame value. Either every effect of the run is
    /// applied, or none is.
    pub fn execute<B: AsRef<[u8]>>(
        &mut self,
        caller: Address,
        executor: Address,
        commands: &[B],
        state: Vec<Vec<u8>>,
        value: Word,
    ) -> Result<Vec<Vec<u8>>, VMError> {
        let mut overlay = OverlayState::new(&self.state);
        let mut logs = Vec::new();

        if !value.is_zero() {
            env::transfer(&mut overlay, caller, executor, value).map_err(|_| {
                VMError::InsufficientBalance {
                    needed: value.to_u128().unwrap_or(u128::MAX),
                    available: env::balance_of(&self.state, caller)
                        .to_u128()
                        .unwrap_or(u128::MAX),
                }
            })?;
        }

        let frame = Frame::root(caller, executor, value);
        let result = {
            let mut env = CallEnv::new(&mut overlay, &self.contracts, &mut logs, frame, 0);
            vm::execute(&mut env, commands, state)
        };

        match result {
            Ok(state) => {
                let writes = overlay.into_writes();
                self.state.commit(writes);
                info!(
                    "run by {executor} completed with {} slots, {} events",
                    state.len(),
                    logs.len()
                );
                self.logs.append(&mut logs);
                Ok(state)
            }
            Err(e) => {
                warn!("run by {executor} reverted: {e}");
                Err(e)
            }
        }
    }
}

/// Shorthand for a message with no value attached.
pub fn message(kind: CallKind, target: Address, input: &[u8]) -> Message<'_> {
    Message {
        kind,
        target,
        input,
        value: Word::zero(),
    }
}
