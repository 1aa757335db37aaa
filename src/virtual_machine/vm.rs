//! The command execution loop.
//!
//! A [`VM`] owns a decoded command list and the state vector for one run. It
//! walks the list in order: build the call data for a command, dispatch it to
//! the [`Host`], write the return data back into the state. The first failing
//! command aborts the run and nothing after it is dispatched.

mod context;
mod slots;
#[cfg(test)]
mod tests;

pub use context::Status;
pub use slots::Slots;

use crate::virtual_machine::command::Command;
use crate::virtual_machine::dispatch::{Host, dispatch};
use crate::virtual_machine::errors::{RevertData, VMError};
use crate::virtual_machine::inputs::build_inputs;
use crate::virtual_machine::outputs::write_outputs;
use crate::virtual_machine::verifier::verify;
use crate::{debug, warn};

/// One run of a command list over a state vector.
pub struct VM {
    /// Decoded commands, executed in list order.
    commands: Vec<Command>,
    /// Working state; the run's result once completed.
    slots: Slots,
    /// Index of the command being executed, or the count once completed.
    pc: usize,
    status: Status,
}

impl VM {
    /// Accepts a decoded command list and an initial state.
    ///
    /// Every statically checkable slot reference is validated here, so an
    /// invalid program never reaches the `Ready` status.
    pub fn new(commands: Vec<Command>, state: Vec<Vec<u8>>) -> Result<Self, VMError> {
        let slots = Slots::new(state)?;
        verify(&commands, slots.len())?;
        Ok(Self {
            commands,
            slots,
            pc: 0,
            status: Status::Ready,
        })
    }

    /// Decodes raw 32-byte records, then behaves like [`VM::new`].
    pub fn from_raw<B: AsRef<[u8]>>(raw: &[B], state: Vec<Vec<u8>>) -> Result<Self, VMError> {
        Self::new(Command::decode_all(raw)?, state)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn state(&self) -> &[Vec<u8>] {
        self.slots.as_slice()
    }

    /// Consumes the engine, returning the state vector.
    pub fn into_state(self) -> Vec<Vec<u8>> {
        self.slots.into_inner()
    }

    /// Executes every command against `host`.
    ///
    /// Can only be called once. On failure the status is `Aborted` and the
    /// error names the failing command where one exists.
    pub fn run<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), VMError> {
        if self.status != Status::Ready {
            return Err(VMError::NotReady {
                status: self.status.as_str(),
            });
        }
        self.status = Status::Running;

        while self.pc < self.commands.len() {
            if let Err(e) = self.step(host) {
                warn!("command {} aborted the run: {e}", self.pc);
                self.status = Status::Aborted;
                return Err(e);
            }
            self.pc += 1;
        }

        self.status = Status::Completed;
        Ok(())
    }

    /// Executes the command at `pc`.
    fn step<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), VMError> {
        let command = self.commands[self.pc];
        let input = build_inputs(self.pc, &command, &self.slots)?;
        debug!(
            "command {}: {command} ({} bytes in)",
            self.pc,
            input.data.len()
        );

        let outcome = dispatch(host, &command, &input.data, input.value);
        if !outcome.success {
            return Err(VMError::CalleeFailure {
                command: self.pc,
                payload: RevertData(outcome.return_data),
            });
        }
        write_outputs(&command, &mut self.slots, outcome.return_data)
    }
}

/// Runs `commands` over `state` and returns the final state.
///
/// On failure the working state is dropped; callers that need all-or-nothing
/// effects on the host must buffer them themselves.
pub fn execute<H: Host + ?Sized, B: AsRef<[u8]>>(
    host: &mut H,
    commands: &[B],
    state: Vec<Vec<u8>>,
) -> Result<Vec<Vec<u8>>, VMError> {
    let mut vm = VM::from_raw(commands, state)?;
    vm.run(host)?;
    Ok(vm.into_state())
}
