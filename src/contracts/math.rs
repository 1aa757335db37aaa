use crate::runtime::contract::{Contract, ret_word, unknown_function, word_arg, words_arg};
use crate::runtime::env::CallEnv;
use crate::types::word::Word;
use crate::virtual_machine::errors::RevertData;

/// Checked 256-bit unsigned arithmetic.
pub struct Math;

impl Contract for Math {
    fn name(&self) -> &'static str {
        "Math"
    }

    fn functions(&self) -> &'static [&'static str] {
        &[
            "add(uint256,uint256)",
            "sub(uint256,uint256)",
            "mul(uint256,uint256)",
            "sum(uint256[])",
        ]
    }

    fn invoke(
        &self,
        _env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        let result = match function {
            "sum(uint256[])" => words_arg(args, 0)?
                .iter()
                .try_fold(Word::zero(), |acc, w| acc.checked_add(w)),
            binary => {
                let a = word_arg(args, 0)?;
                let b = word_arg(args, 1)?;
                match binary {
                    "add(uint256,uint256)" => a.checked_add(&b),
                    "sub(uint256,uint256)" => a.checked_sub(&b),
                    "mul(uint256,uint256)" => a.checked_mul(&b),
                    other => return Err(unknown_function(self.name(), other)),
                }
            }
        };
        result
            .map(ret_word)
            .ok_or_else(|| RevertData::reason("arithmetic overflow"))
    }
}
