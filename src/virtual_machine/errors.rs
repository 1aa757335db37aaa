//! Engine, assembler and script error types.

use crate::types::encoding::DecodeError;
use crate::types::hex;
use opchain_derive::Error;
use std::fmt;

/// Selector of the conventional `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Raw failure payload returned by a callee.
///
/// Kept byte-for-byte so the caller can match on specific failure reasons.
/// `Display` shows the decoded `Error(string)` reason when the payload has
/// that shape and falls back to hex otherwise.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevertData(pub Vec<u8>);

impl RevertData {
    /// Encodes `reason` as an `Error(string)` payload.
    pub fn reason(reason: &str) -> Self {
        let mut out = ERROR_STRING_SELECTOR.to_vec();
        out.extend(crate::virtual_machine::abi::encode_bytes(reason.as_bytes()));
        RevertData(out)
    }

    /// Decodes an `Error(string)` payload into its message.
    pub fn decoded_reason(&self) -> Option<String> {
        let body = self.0.strip_prefix(&ERROR_STRING_SELECTOR)?;
        let raw = crate::virtual_machine::abi::decode_bytes(body).ok()?;
        String::from_utf8(raw).ok()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for RevertData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decoded_reason() {
            Some(reason) => write!(f, "\"{reason}\""),
            None if self.0.is_empty() => write!(f, "<empty>"),
            None => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

/// Errors that can occur while decoding, validating or executing commands,
/// and while assembling or loading scripts.
#[derive(Debug, Error)]
pub enum VMError {
    /// A command record was not exactly 32 bytes.
    #[error("command {index} is malformed: expected 32 bytes, got {length}")]
    MalformedCommand { index: usize, length: usize },
    /// An argument or output index referenced a slot that does not exist.
    #[error("slot {slot} out of range ({available} slots available)")]
    SlotOutOfRange { slot: u8, available: usize },
    /// The target call failed; the payload is forwarded unmodified.
    #[error("command {command} failed: {payload}")]
    CalleeFailure { command: usize, payload: RevertData },
    /// Data was too short or misshapen for the declared value shape.
    #[error("encoding mismatch in {what}: needed {needed} bytes, have {available}")]
    EncodingMismatch {
        what: &'static str,
        needed: usize,
        available: usize,
    },
    /// A value-bearing call did not name a static value slot.
    #[error("command {command} is a value call without a static value slot")]
    MissingValueSlot { command: usize },
    /// The state vector would exceed the addressable slot count.
    #[error("state of {len} slots exceeds the maximum of {max}")]
    StateTooLarge { len: usize, max: usize },
    /// `run` was called on an engine that is not in the `Ready` status.
    #[error("engine is {status}, expected Ready")]
    NotReady { status: &'static str },
    /// The caller cannot cover the value forwarded to the run.
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },
    /// Assembly error with source location.
    #[error("line {line}:{offset}: {reason}")]
    AssemblyError {
        line: usize,
        offset: usize,
        reason: String,
    },
    /// A serialized script could not be decoded.
    #[error("decoding error: {reason}")]
    DecodeError { reason: String },
    /// File I/O failed while loading or writing a script.
    #[error("io error on {path}: {reason}")]
    IoError { path: String, reason: String },
}

impl From<DecodeError> for VMError {
    fn from(err: DecodeError) -> Self {
        VMError::DecodeError {
            reason: err.to_string(),
        }
    }
}

impl VMError {
    /// Returns the callee's raw failure payload for `CalleeFailure` errors.
    pub fn revert_data(&self) -> Option<&[u8]> {
        match self {
            VMError::CalleeFailure { payload, .. } => Some(payload.as_slice()),
            _ => None,
        }
    }
}
