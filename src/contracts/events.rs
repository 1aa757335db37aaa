use crate::runtime::contract::{Contract, address_arg, bytes_arg, unknown_function, word_arg};
use crate::runtime::env::CallEnv;
use crate::types::word::Word;
use crate::virtual_machine::errors::RevertData;

/// Emits one event per call, in the caller's name when delegated to.
pub struct Events;

impl Contract for Events {
    fn name(&self) -> &'static str {
        "Events"
    }

    fn functions(&self) -> &'static [&'static str] {
        &[
            "logUint(uint256)",
            "logString(string)",
            "logAddress(address)",
            "logBytes(bytes)",
        ]
    }

    fn invoke(
        &self,
        env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        let (name, data) = match function {
            "logUint(uint256)" => ("LogUint", word_arg(args, 0)?.0.to_vec()),
            "logString(string)" => ("LogString", bytes_arg(args, 0)?),
            "logAddress(address)" => (
                "LogAddress",
                Word::from_address(address_arg(args, 0)?).0.to_vec(),
            ),
            "logBytes(bytes)" => ("LogBytes", bytes_arg(args, 0)?),
            other => return Err(unknown_function(self.name(), other)),
        };
        env.emit(name, data)?;
        Ok(Vec::new())
    }
}
