use crate::runtime::contract::{Contract, bytes_arg, bytes_array_arg, unknown_function};
use crate::runtime::env::CallEnv;
use crate::virtual_machine::abi;
use crate::virtual_machine::command::COMMAND_SIZE;
use crate::virtual_machine::errors::{RevertData, VMError};
use crate::virtual_machine::vm;

/// Runs a nested command list in the calling frame.
///
/// `execute(bytes,bytes[])` takes the commands as concatenated 32-byte records
/// and returns the final state as `bytes[]`. Callee failures inside the nested
/// run are re-raised with the callee's payload unchanged; any other engine
/// error becomes an `Error(string)` revert.
pub struct Executor;

impl Contract for Executor {
    fn name(&self) -> &'static str {
        "Executor"
    }

    fn functions(&self) -> &'static [&'static str] {
        &["execute(bytes,bytes[])"]
    }

    fn invoke(
        &self,
        env: &mut CallEnv<'_>,
        function: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, RevertData> {
        if function != "execute(bytes,bytes[])" {
            return Err(unknown_function(self.name(), function));
        }
        let commands = bytes_arg(args, 0)?;
        let records: Vec<&[u8]> = commands.chunks(COMMAND_SIZE).collect();
        let state = bytes_array_arg(args, 1)?;

        match vm::execute(env, &records, state) {
            Ok(state) => Ok(abi::encode_bytes_array(&state)),
            Err(VMError::CalleeFailure { payload, .. }) => Err(payload),
            Err(e) => Err(RevertData::reason(&e.to_string())),
        }
    }
}
