//! Contracts that expose or depend on the calling context.

use crate::runtime::contract::{Contract, ret_word, unknown_function};
use crate::runtime::env::CallEnv;
use crate::types::word::Word;
use crate::virtual_machine::errors::RevertData;

/// Reports who called it.
pub struct Sender;

impl Contract for Sender {
    fn name(&self) -> &'static str {
        "Sender"
    }

    fn functions(&self) -> &'static [&'static str] {
        &["sender()"]
    }

    fn invoke(
        &self,
        env: &mut CallEnv<'_>,
        function: &str,
        _args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        match function {
            "sender()" => Ok(ret_word(Word::from_address(env.sender()))),
            other => Err(unknown_function(self.name(), other)),
        }
    }
}

/// Accepts value through `pay()` or a plain transfer.
pub struct Payable;

impl Contract for Payable {
    fn name(&self) -> &'static str {
        "Payable"
    }

    fn functions(&self) -> &'static [&'static str] {
        &["pay()", "balance()"]
    }

    fn invoke(
        &self,
        env: &mut CallEnv<'_>,
        function: &str,
        _args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        match function {
            "pay()" => {
                env.emit("Paid", env.value().0.to_vec())?;
                Ok(Vec::new())
            }
            "balance()" => Ok(ret_word(env.balance(env.address()))),
            other => Err(unknown_function(self.name(), other)),
        }
    }

    fn fallback(&self, _env: &mut CallEnv<'_>, data: &[u8]) -> Result<Vec<u8>, RevertData> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        Err(RevertData::reason("Payable: unexpected calldata"))
    }
}

/// Always fails.
pub struct Revert;

impl Contract for Revert {
    fn name(&self) -> &'static str {
        "Revert"
    }

    fn functions(&self) -> &'static [&'static str] {
        &["fail()"]
    }

    fn invoke(
        &self,
        _env: &mut CallEnv<'_>,
        _function: &str,
        _args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        Err(RevertData::reason("Hello World!"))
    }
}
