use crate::runtime::contract::{Contract, bytes_arg, ret_word, unknown_function};
use crate::runtime::env::CallEnv;
use crate::types::word::Word;
use crate::virtual_machine::abi;
use crate::virtual_machine::errors::RevertData;

/// Byte-string helpers.
pub struct Strings;

impl Contract for Strings {
    fn name(&self) -> &'static str {
        "Strings"
    }

    fn functions(&self) -> &'static [&'static str] {
        &["strlen(string)", "strcat(string,string)"]
    }

    fn invoke(
        &self,
        _env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        match function {
            "strlen(string)" => Ok(ret_word(Word::from_usize(bytes_arg(args, 0)?.len()))),
            "strcat(string,string)" => {
                let mut joined = bytes_arg(args, 0)?;
                joined.extend(bytes_arg(args, 1)?);
                Ok(abi::encode_bytes(&joined))
            }
            other => Err(unknown_function(self.name(), other)),
        }
    }
}
