use crate::runtime::contract::{Contract, address_arg, ret_word, unknown_function, word_arg};
use crate::runtime::env::CallEnv;
use crate::types::address::Address;
use crate::types::word::Word;
use crate::virtual_machine::errors::RevertData;

/// A minimal fungible token kept in its own storage.
///
/// `mint` is unrestricted; the token exists to give scripts something with
/// balances to move around.
pub struct Token;

const TOTAL_SUPPLY_KEY: Word = Word::zero();

fn holder_key(holder: Address) -> Word {
    Word::keccak_concat(&[b"holder", holder.as_slice()])
}

impl Token {
    fn credit(env: &mut CallEnv<'_>, to: Address, amount: Word) -> Result<(), RevertData> {
        let key = holder_key(to);
        let balance = env
            .sload(key)
            .checked_add(&amount)
            .ok_or_else(|| RevertData::reason("Token: balance overflow"))?;
        env.sstore(key, balance)
    }
}

impl Contract for Token {
    fn name(&self) -> &'static str {
        "Token"
    }

    fn functions(&self) -> &'static [&'static str] {
        &[
            "transfer(address,uint256)",
            "balanceOf(address)",
            "totalSupply()",
            "mint(address,uint256)",
        ]
    }

    fn invoke(
        &self,
        env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        match function {
            "transfer(address,uint256)" => {
                let to = address_arg(args, 0)?;
                let amount = word_arg(args, 1)?;
                let from_key = holder_key(env.sender());
                let remaining = env
                    .sload(from_key)
                    .checked_sub(&amount)
                    .ok_or_else(|| RevertData::reason("Token: transfer amount exceeds balance"))?;
                env.sstore(from_key, remaining)?;
                Self::credit(env, to, amount)?;
                env.emit("Transfer", [Word::from_address(to).0, amount.0].concat())?;
                Ok(ret_word(Word::from_bool(true)))
            }
            "balanceOf(address)" => Ok(ret_word(env.sload(holder_key(address_arg(args, 0)?)))),
            "totalSupply()" => Ok(ret_word(env.sload(TOTAL_SUPPLY_KEY))),
            "mint(address,uint256)" => {
                let to = address_arg(args, 0)?;
                let amount = word_arg(args, 1)?;
                let supply = env
                    .sload(TOTAL_SUPPLY_KEY)
                    .checked_add(&amount)
                    .ok_or_else(|| RevertData::reason("Token: supply overflow"))?;
                env.sstore(TOTAL_SUPPLY_KEY, supply)?;
                Self::credit(env, to, amount)?;
                Ok(Vec::new())
            }
            other => Err(unknown_function(self.name(), other)),
        }
    }
}
