//! Native contracts and calldata helpers.

use crate::runtime::env::CallEnv;
use crate::types::address::Address;
use crate::types::word::Word;
use crate::virtual_machine::abi;
use crate::virtual_machine::command::selector_of;
use crate::virtual_machine::errors::RevertData;

/// Code deployed at an address of a [`World`](crate::runtime::world::World).
///
/// A contract names the canonical signatures it answers to; calls whose
/// selector matches one of them reach [`Contract::invoke`] with the selector
/// stripped, everything else reaches [`Contract::fallback`] with the raw data.
pub trait Contract: Send + Sync {
    fn name(&self) -> &'static str;

    fn functions(&self) -> &'static [&'static str];

    fn invoke(
        &self,
        env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData>;

    /// Handles calls without a matching selector, including plain value transfers.
    fn fallback(&self, _env: &mut CallEnv<'_>, _data: &[u8]) -> Result<Vec<u8>, RevertData> {
        Err(RevertData::reason(&format!("{}: no fallback", self.name())))
    }
}

/// Routes raw call data to the matching function of `contract`.
pub(crate) fn route(
    contract: &dyn Contract,
    env: &mut CallEnv<'_>,
    input: &[u8],
) -> Result<Vec<u8>, RevertData> {
    if let Some(selector) = input.get(..4) {
        let function = contract
            .functions()
            .iter()
            .find(|sig| selector_of(sig).as_slice() == selector);
        if let Some(function) = function {
            return contract.invoke(env, function, &input[4..]);
        }
    }
    contract.fallback(env, input)
}

/// Reverts with the standard message for an unknown function.
pub fn unknown_function(contract: &str, function: &str) -> RevertData {
    RevertData::reason(&format!("{contract}: unknown function {function}"))
}

fn bad_calldata(e: impl std::fmt::Display) -> RevertData {
    RevertData::reason(&format!("invalid calldata: {e}"))
}

/// Head word `index` of the arguments.
pub fn word_arg(args: &[u8], index: usize) -> Result<Word, RevertData> {
    abi::word_at(args, index).map_err(bad_calldata)
}

/// Head word `index` as an index or length.
pub fn usize_arg(args: &[u8], index: usize) -> Result<usize, RevertData> {
    word_arg(args, index)?
        .to_usize()
        .ok_or_else(|| RevertData::reason("invalid calldata: integer too large"))
}

/// Head word `index` as an address; the upper 12 bytes must be zero.
pub fn address_arg(args: &[u8], index: usize) -> Result<Address, RevertData> {
    let word = word_arg(args, index)?;
    if word.0[..12].iter().any(|&b| b != 0) {
        return Err(RevertData::reason("invalid calldata: dirty address"));
    }
    Ok(word.to_address())
}

/// `bytes`/`string` argument `index`.
pub fn bytes_arg(args: &[u8], index: usize) -> Result<Vec<u8>, RevertData> {
    abi::decode_bytes_at(args, index).map_err(bad_calldata)
}

/// `bytes[]` argument `index`.
pub fn bytes_array_arg(args: &[u8], index: usize) -> Result<Vec<Vec<u8>>, RevertData> {
    abi::decode_bytes_array_at(args, index).map_err(bad_calldata)
}

/// `uint256[]` argument `index`.
pub fn words_arg(args: &[u8], index: usize) -> Result<Vec<Word>, RevertData> {
    abi::decode_words_at(args, index).map_err(bad_calldata)
}

/// Encodes a single word return value.
pub fn ret_word(word: Word) -> Vec<u8> {
    word.0.to_vec()
}
