//! Helpers around multi-value returns and whole-state arguments.

use crate::runtime::contract::{
    Contract, bytes_arg, bytes_array_arg, ret_word, unknown_function, usize_arg, word_arg,
};
use crate::runtime::env::CallEnv;
use crate::types::word::Word;
use crate::virtual_machine::abi;
use crate::virtual_machine::errors::RevertData;

/// Operates on a state vector passed in whole.
pub struct StateTest;

impl Contract for StateTest {
    fn name(&self) -> &'static str {
        "StateTest"
    }

    fn functions(&self) -> &'static [&'static str] {
        &["addSlots(uint256,uint256,uint256,bytes[])"]
    }

    /// `addSlots(dest, a, b, state)` returns `state` with
    /// `state[dest] = state[a] + state[b]`.
    fn invoke(
        &self,
        _env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        if function != "addSlots(uint256,uint256,uint256,bytes[])" {
            return Err(unknown_function(self.name(), function));
        }
        let dest = usize_arg(args, 0)?;
        let a = usize_arg(args, 1)?;
        let b = usize_arg(args, 2)?;
        let mut state = bytes_array_arg(args, 3)?;

        let word = |i: usize| {
            state
                .get(i)
                .and_then(|slot| Word::from_slice(slot))
                .ok_or_else(|| RevertData::reason("StateTest: slot is not a word"))
        };
        let sum = word(a)?
            .checked_add(&word(b)?)
            .ok_or_else(|| RevertData::reason("arithmetic overflow"))?;
        let slot = state
            .get_mut(dest)
            .ok_or_else(|| RevertData::reason("StateTest: destination out of range"))?;
        *slot = sum.0.to_vec();
        Ok(abi::encode_bytes_array(&state))
    }
}

/// Returns and consumes a fixed two-word tuple.
pub struct MultiReturn;

impl Contract for MultiReturn {
    fn name(&self) -> &'static str {
        "MultiReturn"
    }

    fn functions(&self) -> &'static [&'static str] {
        &["intTuple()", "tupleConsumer(uint256)"]
    }

    fn invoke(
        &self,
        env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        match function {
            "intTuple()" => Ok([Word::from_u64(0xbad).0, Word::from_u64(0xdeed).0].concat()),
            "tupleConsumer(uint256)" => {
                env.emit("Calculated", word_arg(args, 0)?.0.to_vec())?;
                Ok(Vec::new())
            }
            other => Err(unknown_function(self.name(), other)),
        }
    }
}

/// Slices raw tuples stored with the tuple-return flag.
pub struct Tupler;

impl Contract for Tupler {
    fn name(&self) -> &'static str {
        "Tupler"
    }

    fn functions(&self) -> &'static [&'static str] {
        &["extractElement(bytes,uint256)"]
    }

    fn invoke(
        &self,
        _env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        if function != "extractElement(bytes,uint256)" {
            return Err(unknown_function(self.name(), function));
        }
        let tuple = bytes_arg(args, 0)?;
        let index = usize_arg(args, 1)?;
        word_arg(&tuple, index).map(ret_word)
    }
}
