//! Call frames and the environment a native contract runs in.

use crate::runtime::contract::{Contract, route};
use crate::runtime::state::{OverlayState, State};
use crate::types::address::Address;
use crate::types::word::Word;
use crate::virtual_machine::dispatch::{CallKind, CallOutcome, Host, Message};
use crate::virtual_machine::errors::RevertData;
use std::collections::BTreeMap;

/// Nested calls deeper than this fail.
pub const MAX_CALL_DEPTH: usize = 64;

/// Deployed code, keyed by address.
pub type Contracts = BTreeMap<Address, Box<dyn Contract>>;

/// An event emitted by a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// Account whose context emitted the event.
    pub address: Address,
    pub name: &'static str,
    pub data: Vec<u8>,
}

/// Identity and permissions of one call frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Account whose storage and balance the frame acts on.
    pub address: Address,
    /// Account whose code is running; differs from `address` under delegation.
    pub code: Address,
    pub sender: Address,
    pub value: Word,
    /// Storage writes, events and value transfers are refused.
    pub is_static: bool,
}

impl Frame {
    /// Top-level frame of `address` called by `sender`.
    pub fn root(sender: Address, address: Address, value: Word) -> Self {
        Self {
            address,
            code: address,
            sender,
            value,
            is_static: false,
        }
    }

    /// Frame a call of `kind` from `self` into `target` runs in.
    pub fn child(&self, kind: CallKind, target: Address, value: Word) -> Self {
        match kind {
            CallKind::Delegate => Self {
                code: target,
                ..*self
            },
            CallKind::Call => Self {
                address: target,
                code: target,
                sender: self.address,
                value: Word::zero(),
                is_static: self.is_static,
            },
            CallKind::Static => Self {
                address: target,
                code: target,
                sender: self.address,
                value: Word::zero(),
                is_static: true,
            },
            CallKind::Value => Self {
                address: target,
                code: target,
                sender: self.address,
                value,
                is_static: self.is_static,
            },
        }
    }
}

/// What a running contract can see and touch.
///
/// Every frame owns an overlay over its parent's storage; the overlay and the
/// frame's events are handed back to the parent only if the frame succeeds.
pub struct CallEnv<'a> {
    state: &'a mut dyn State,
    contracts: &'a Contracts,
    logs: &'a mut Vec<Log>,
    frame: Frame,
    depth: usize,
}

impl<'a> CallEnv<'a> {
    pub fn new(
        state: &'a mut dyn State,
        contracts: &'a Contracts,
        logs: &'a mut Vec<Log>,
        frame: Frame,
        depth: usize,
    ) -> Self {
        Self {
            state,
            contracts,
            logs,
            frame,
            depth,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn address(&self) -> Address {
        self.frame.address
    }

    pub fn sender(&self) -> Address {
        self.frame.sender
    }

    pub fn value(&self) -> Word {
        self.frame.value
    }

    pub fn is_static(&self) -> bool {
        self.frame.is_static
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Reads a word of the current account's storage; unset keys read as zero.
    pub fn sload(&self, key: Word) -> Word {
        self.state
            .get(storage_key(self.frame.address, key))
            .and_then(|v| Word::from_slice(&v))
            .unwrap_or_default()
    }

    /// Writes a word of the current account's storage.
    pub fn sstore(&mut self, key: Word, value: Word) -> Result<(), RevertData> {
        self.ensure_writable("storage write")?;
        let slot = storage_key(self.frame.address, key);
        if value.is_zero() {
            self.state.delete(slot);
        } else {
            self.state.push(slot, value.0.to_vec());
        }
        Ok(())
    }

    pub fn balance(&self, account: Address) -> Word {
        balance_of(&*self.state, account)
    }

    /// Appends an event in the current account's name.
    pub fn emit(&mut self, name: &'static str, data: Vec<u8>) -> Result<(), RevertData> {
        self.ensure_writable("event")?;
        self.logs.push(Log {
            address: self.frame.address,
            name,
            data,
        });
        Ok(())
    }

    fn ensure_writable(&self, what: &str) -> Result<(), RevertData> {
        if self.frame.is_static {
            return Err(RevertData::reason(&format!("{what} in static context")));
        }
        Ok(())
    }
}

impl Host for CallEnv<'_> {
    fn call(&mut self, msg: Message<'_>) -> CallOutcome {
        dispatch(
            &mut *self.state,
            self.contracts,
            &mut *self.logs,
            &self.frame,
            self.depth + 1,
            msg,
        )
    }
}

/// Runs one message in a fresh frame below `parent`.
///
/// Storage writes, balance movements and events of the frame are applied to
/// `state` and `logs` only on success. Accounts without code accept any call
/// and return nothing.
pub(crate) fn dispatch(
    state: &mut dyn State,
    contracts: &Contracts,
    logs: &mut Vec<Log>,
    parent: &Frame,
    depth: usize,
    msg: Message<'_>,
) -> CallOutcome {
    if depth > MAX_CALL_DEPTH {
        return CallOutcome::failure(RevertData::reason("call depth exceeded").0);
    }

    let frame = parent.child(msg.kind, msg.target, msg.value);
    let mut overlay = OverlayState::new(&*state);
    let mut frame_logs = Vec::new();

    let result = (|| -> Result<Vec<u8>, RevertData> {
        if msg.kind == CallKind::Value && !msg.value.is_zero() {
            if parent.is_static {
                return Err(RevertData::reason("value transfer in static context"));
            }
            transfer(&mut overlay, parent.address, msg.target, msg.value)?;
        }
        match contracts.get(&frame.code) {
            Some(contract) => {
                let mut env = CallEnv::new(&mut overlay, contracts, &mut frame_logs, frame, depth);
                route(contract.as_ref(), &mut env, msg.input)
            }
            None => Ok(Vec::new()),
        }
    })();

    match result {
        Ok(data) => {
            let writes = overlay.into_writes();
            state.commit(writes);
            logs.append(&mut frame_logs);
            CallOutcome::success(data)
        }
        Err(payload) => CallOutcome::failure(payload.0),
    }
}

/// Storage slot `key` of `account`.
pub fn storage_key(account: Address, key: Word) -> Word {
    Word::keccak_concat(&[b"storage", account.as_slice(), key.as_slice()])
}

fn balance_key(account: Address) -> Word {
    Word::keccak_concat(&[b"balance", account.as_slice()])
}

pub fn balance_of(state: &dyn State, account: Address) -> Word {
    state
        .get(balance_key(account))
        .and_then(|v| Word::from_slice(&v))
        .unwrap_or_default()
}

pub fn set_balance(state: &mut dyn State, account: Address, amount: Word) {
    state.push(balance_key(account), amount.0.to_vec());
}

/// Moves `amount` from `from` to `to`.
pub fn transfer(
    state: &mut dyn State,
    from: Address,
    to: Address,
    amount: Word,
) -> Result<(), RevertData> {
    let from_balance = balance_of(state, from);
    let remaining = from_balance
        .checked_sub(&amount)
        .ok_or_else(|| RevertData::reason("insufficient balance"))?;
    set_balance(state, from, remaining);
    let credited = balance_of(state, to)
        .checked_add(&amount)
        .ok_or_else(|| RevertData::reason("balance overflow"))?;
    set_balance(state, to, credited);
    Ok(())
}
