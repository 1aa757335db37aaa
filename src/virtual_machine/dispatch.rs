//! Dispatcher: call kinds and the host boundary.
//!
//! The engine never executes callee code itself. Every command becomes a
//! [`Message`] handed to a [`Host`], which answers with a [`CallOutcome`].
//! Whether a failed outcome aborts the run is decided by the execution loop.

use crate::types::address::Address;
use crate::types::word::Word;
use crate::virtual_machine::command::Command;
use std::fmt;

/// How the target is invoked. Encoded in the low two bits of the flag byte.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Callee code runs in the caller's context (storage, identity, value).
    Delegate = 0x00,
    /// Callee runs in its own context and may mutate state.
    Call = 0x01,
    /// Callee runs in its own context and must not mutate anything.
    Static = 0x02,
    /// As [`CallKind::Call`], plus a value transfer taken from a state slot.
    Value = 0x03,
}

impl CallKind {
    /// Mask selecting the call-kind bits of the flag byte.
    pub const MASK: u8 = 0x03;

    /// Every bit pattern under [`CallKind::MASK`] is a valid kind.
    pub const fn from_flags(flags: u8) -> Self {
        match flags & Self::MASK {
            0x00 => CallKind::Delegate,
            0x01 => CallKind::Call,
            0x02 => CallKind::Static,
            _ => CallKind::Value,
        }
    }

    pub const fn mnemonic(&self) -> &'static str {
        match self {
            CallKind::Delegate => "delegatecall",
            CallKind::Call => "call",
            CallKind::Static => "staticcall",
            CallKind::Value => "valuecall",
        }
    }

    /// Parses an assembler mnemonic.
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        match name {
            "delegatecall" => Some(CallKind::Delegate),
            "call" => Some(CallKind::Call),
            "staticcall" => Some(CallKind::Static),
            "valuecall" => Some(CallKind::Value),
            _ => None,
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A fully built call, ready for the host.
#[derive(Clone, Copy, Debug)]
pub struct Message<'a> {
    pub kind: CallKind,
    pub target: Address,
    pub input: &'a [u8],
    /// Amount to transfer; zero for every kind but [`CallKind::Value`].
    pub value: Word,
}

/// Result of one dispatched call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    /// Return data on success, failure payload otherwise.
    pub return_data: Vec<u8>,
}

impl CallOutcome {
    pub fn success(return_data: Vec<u8>) -> Self {
        Self {
            success: true,
            return_data,
        }
    }

    pub fn failure(payload: Vec<u8>) -> Self {
        Self {
            success: false,
            return_data: payload,
        }
    }
}

/// The environment commands are dispatched into.
///
/// Implementations decide what each [`CallKind`] means for their state
/// model; the engine only promises to pass the kind through unchanged.
pub trait Host {
    fn call(&mut self, msg: Message<'_>) -> CallOutcome;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn call(&mut self, msg: Message<'_>) -> CallOutcome {
        (**self).call(msg)
    }
}

/// Sends one command's input to the host under its call kind.
pub(crate) fn dispatch<H: Host + ?Sized>(
    host: &mut H,
    command: &Command,
    input: &[u8],
    value: Word,
) -> CallOutcome {
    let kind = command.call_kind();
    let value = match kind {
        CallKind::Value => value,
        CallKind::Delegate | CallKind::Call | CallKind::Static => Word::zero(),
    };
    host.call(Message {
        kind,
        target: command.target,
        input,
        value,
    })
}
