//! Input builder: turns a command's argument list into call data.

use crate::types::word::Word;
use crate::virtual_machine::abi::{Token, encode_tokens_into};
use crate::virtual_machine::command::{Arg, Command};
use crate::virtual_machine::dispatch::CallKind;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm::Slots;

/// Call data and forwarded value for one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallInput {
    pub data: Vec<u8>,
    pub value: Word,
}

/// Builds the exact byte buffer sent to a command's target.
///
/// Value calls consume their first argument as the value slot. The remaining
/// arguments are laid out head/tail behind the selector, or without one for
/// the fallback selector. With the state-input flag set, the listed arguments
/// are ignored and the whole state is passed as one `bytes[]` argument. With
/// the ABI-tail flag set, dynamic slots are spliced into the tail as-is.
pub fn build_inputs(index: usize, command: &Command, slots: &Slots) -> Result<CallInput, VMError> {
    let mut args = command.args();

    let value = match command.call_kind() {
        CallKind::Value => match args.next() {
            Some(Arg::Static(slot)) => Word(*slots.word(slot)?),
            _ => return Err(VMError::MissingValueSlot { command: index }),
        },
        CallKind::Delegate | CallKind::Call | CallKind::Static => Word::zero(),
    };

    let mut data = Vec::new();
    if !command.is_fallback() {
        data.extend_from_slice(&command.selector);
    }

    if command.state_input() {
        encode_tokens_into(&mut data, &[Token::BytesArray(slots.as_slice())]);
    } else {
        let tokens = args
            .map(|arg| token_for(arg, slots, command.abi_tail()))
            .collect::<Result<Vec<_>, _>>()?;
        encode_tokens_into(&mut data, &tokens);
    }

    Ok(CallInput { data, value })
}

fn token_for(arg: Arg, slots: &Slots, abi_tail: bool) -> Result<Token<'_>, VMError> {
    Ok(match arg {
        Arg::Static(slot) => Token::Word(slots.word(slot)?),
        Arg::Dynamic(slot) if abi_tail => Token::Tail(slots.get(slot)?),
        Arg::Dynamic(slot) => Token::Bytes(slots.get(slot)?),
        Arg::State => Token::BytesArray(slots.as_slice()),
    })
}
