//! Pre-flight validation of a command list against its initial state.
//!
//! Every slot reference that can be checked without running anything is
//! checked here, so a malformed program is rejected before the first call.
//! The verifier tracks how many slots are guaranteed to exist at each step:
//! outputs addressed at the current length grow it by one. After a command
//! that replaces the state the count is unknown and later references are left
//! to the runtime checks.

use crate::virtual_machine::command::{Arg, Command, MAX_STATE_SLOTS, Output};
use crate::virtual_machine::dispatch::CallKind;
use crate::virtual_machine::errors::VMError;

/// Validates `commands` for a run starting from `state_len` slots.
pub fn verify(commands: &[Command], state_len: usize) -> Result<(), VMError> {
    if state_len > MAX_STATE_SLOTS {
        return Err(VMError::StateTooLarge {
            len: state_len,
            max: MAX_STATE_SLOTS,
        });
    }

    let mut known = Some(state_len);
    for (index, command) in commands.iter().enumerate() {
        let mut args = command.args().peekable();

        if command.call_kind() == CallKind::Value
            && !matches!(args.peek(), Some(Arg::Static(_)))
        {
            return Err(VMError::MissingValueSlot { command: index });
        }

        let Some(len) = known else {
            continue;
        };

        // With the state-input flag only the value slot is read.
        let read: Vec<Arg> = if command.state_input() {
            args.take(usize::from(command.call_kind() == CallKind::Value))
                .collect()
        } else {
            args.collect()
        };
        for slot in read.iter().filter_map(|arg| arg.slot()) {
            check_slot(slot, len)?;
        }

        known = match command.output() {
            Output::Discard => Some(len),
            Output::ReplaceState => None,
            Output::Static(slot) | Output::Dynamic(slot) => {
                let slot_usize = slot as usize;
                if slot_usize > len {
                    return Err(VMError::SlotOutOfRange {
                        slot,
                        available: len,
                    });
                }
                if slot_usize == len {
                    if len + 1 > MAX_STATE_SLOTS {
                        return Err(VMError::StateTooLarge {
                            len: len + 1,
                            max: MAX_STATE_SLOTS,
                        });
                    }
                    Some(len + 1)
                } else {
                    Some(len)
                }
            }
        };
    }
    Ok(())
}

fn check_slot(slot: u8, len: usize) -> Result<(), VMError> {
    if slot as usize >= len {
        return Err(VMError::SlotOutOfRange {
            slot,
            available: len,
        });
    }
    Ok(())
}
