//! Output writer: stores return data back into the state vector.

use crate::types::word::WORD_LEN;
use crate::virtual_machine::abi;
use crate::virtual_machine::command::{Command, Output};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm::Slots;

/// Applies a command's output descriptor to its return data.
///
/// - discard: no effect
/// - replace state: decode `bytes[]` and make it the new vector
/// - tuple-return flag: store the raw return data in the slot
/// - static slot: first word of the return data
/// - dynamic slot with the ABI-tail flag: the return's tail, count word included
/// - dynamic slot: content of a single decoded `bytes` value
pub fn write_outputs(
    command: &Command,
    slots: &mut Slots,
    return_data: Vec<u8>,
) -> Result<(), VMError> {
    match command.output() {
        Output::Discard => Ok(()),
        Output::ReplaceState => slots.replace(abi::decode_bytes_array(&return_data)?),
        Output::Static(slot) | Output::Dynamic(slot) if command.tuple_return() => {
            slots.set(slot, return_data)
        }
        Output::Static(slot) => {
            if return_data.len() < WORD_LEN {
                return Err(VMError::EncodingMismatch {
                    what: "static return",
                    needed: WORD_LEN,
                    available: return_data.len(),
                });
            }
            let mut word = return_data;
            word.truncate(WORD_LEN);
            slots.set(slot, word)
        }
        Output::Dynamic(slot) if command.abi_tail() => {
            slots.set(slot, abi::decode_tail(&return_data)?)
        }
        Output::Dynamic(slot) => slots.set(slot, abi::decode_bytes(&return_data)?),
    }
}
