//! Command decoder.
//!
//! # Layout
//!
//! Every command is one 32-byte record, big-endian field order:
//!
//! ```text
//! selector(4) | flags(1) | args(6) | output(1) | target(20)
//! ```
//!
//! - `flags`: bits 0..1 call kind, `0x40` tuple return, `0x80` state input
//! - `args`: `0xff` ends the list, `0xfe` passes the whole state as `bytes[]`,
//!   high bit marks a dynamic slot, otherwise a static slot
//! - `output`: `0xff` discards, `0xfe` replaces the state, high bit marks a
//!   dynamic slot, otherwise a static slot
//!
//! Decoding is total: any 32 bytes form a command. Whether the indices make
//! sense for a given state is checked by the verifier and the builder.

use crate::types::address::{ADDRESS_LEN, Address};
use crate::types::word::Word;
use crate::virtual_machine::dispatch::CallKind;
use crate::virtual_machine::errors::VMError;
use std::fmt;

/// Size of an encoded command.
pub const COMMAND_SIZE: usize = 32;
/// Number of argument bytes in a command.
pub const MAX_ARGS: usize = 6;

/// Four-byte function selector.
pub type Selector = [u8; 4];

/// Selector meaning "no selector": call the target's fallback or receive
/// behaviour with the argument buffer as raw call data.
pub const FALLBACK_SELECTOR: Selector = [0u8; 4];

/// First four bytes of the Keccak-256 hash of a canonical signature such as
/// `add(uint256,uint256)`.
pub fn selector_of(signature: &str) -> Selector {
    let hash = Word::keccak(signature.as_bytes());
    [hash.0[0], hash.0[1], hash.0[2], hash.0[3]]
}

/// Dynamic slots hold a pre-encoded ABI tail (length or count word first)
/// instead of raw `bytes` content. Used for `T[]` arguments and returns.
pub const FLAG_ABI_TAIL: u8 = 0x20;
/// Store the raw return data in the output slot without decoding it.
pub const FLAG_TUPLE_RETURN: u8 = 0x40;
/// Pass the whole state as the only argument instead of the listed slots.
pub const FLAG_STATE_INPUT: u8 = 0x80;

/// Argument/output byte: end of the argument list, or discard the output.
pub const IDX_END: u8 = 0xff;
/// Argument/output byte: the whole state vector.
pub const IDX_USE_STATE: u8 = 0xfe;
/// High bit marking a dynamic-length slot.
pub const IDX_DYNAMIC: u8 = 0x80;
/// Bits holding the slot index.
pub const IDX_MASK: u8 = 0x7f;

/// Largest state the index encoding can address uniformly.
///
/// Dynamic references to slots 126 and 127 would collide with the
/// `0xfe`/`0xff` sentinels, so the ceiling sits below them.
pub const MAX_STATE_SLOTS: usize = 126;

/// One decoded argument reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg {
    /// A 32-byte slot copied verbatim into the head.
    Static(u8),
    /// A variable-length slot framed as `bytes` in the tail.
    Dynamic(u8),
    /// The whole state vector framed as `bytes[]`.
    State,
}

impl Arg {
    pub const fn from_byte(b: u8) -> Option<Arg> {
        match b {
            IDX_END => None,
            IDX_USE_STATE => Some(Arg::State),
            b if b & IDX_DYNAMIC != 0 => Some(Arg::Dynamic(b & IDX_MASK)),
            b => Some(Arg::Static(b)),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            Arg::Static(i) => i & IDX_MASK,
            Arg::Dynamic(i) => (i & IDX_MASK) | IDX_DYNAMIC,
            Arg::State => IDX_USE_STATE,
        }
    }

    /// Slot index referenced, if any.
    pub const fn slot(self) -> Option<u8> {
        match self {
            Arg::Static(i) | Arg::Dynamic(i) => Some(i),
            Arg::State => None,
        }
    }
}

/// Where a command's return data goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    Discard,
    /// ABI-decode a `bytes[]` return and make it the new state.
    ReplaceState,
    /// First 32 bytes of the return data.
    Static(u8),
    /// ABI-decode a single `bytes` return and store its content.
    Dynamic(u8),
}

impl Output {
    pub const fn from_byte(b: u8) -> Output {
        match b {
            IDX_END => Output::Discard,
            IDX_USE_STATE => Output::ReplaceState,
            b if b & IDX_DYNAMIC != 0 => Output::Dynamic(b & IDX_MASK),
            b => Output::Static(b),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            Output::Discard => IDX_END,
            Output::ReplaceState => IDX_USE_STATE,
            Output::Static(i) => i & IDX_MASK,
            Output::Dynamic(i) => (i & IDX_MASK) | IDX_DYNAMIC,
        }
    }
}

/// An immutable, decoded command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    pub selector: Selector,
    pub flags: u8,
    pub args: [u8; MAX_ARGS],
    pub output: u8,
    pub target: Address,
}

impl Command {
    /// A command with no arguments whose output is discarded.
    pub const fn new(kind: CallKind, selector: Selector, target: Address) -> Self {
        Self {
            selector,
            flags: kind as u8,
            args: [IDX_END; MAX_ARGS],
            output: IDX_END,
            target,
        }
    }

    /// Sets the argument list; anything past [`MAX_ARGS`] is dropped.
    pub fn with_args(mut self, args: &[Arg]) -> Self {
        self.args = [IDX_END; MAX_ARGS];
        for (slot, arg) in self.args.iter_mut().zip(args) {
            *slot = arg.to_byte();
        }
        self
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output.to_byte();
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags |= flags;
        self
    }

    /// Parses one record, failing only if it is not exactly 32 bytes.
    ///
    /// `index` is the record's position in the command list, for error reporting.
    pub fn decode(index: usize, raw: &[u8]) -> Result<Self, VMError> {
        let raw: &[u8; COMMAND_SIZE] = raw.try_into().map_err(|_| VMError::MalformedCommand {
            index,
            length: raw.len(),
        })?;
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&raw[0..4]);
        let mut args = [0u8; MAX_ARGS];
        args.copy_from_slice(&raw[5..11]);
        let mut target = [0u8; ADDRESS_LEN];
        target.copy_from_slice(&raw[12..32]);
        Ok(Self {
            selector,
            flags: raw[4],
            args,
            output: raw[11],
            target: Address(target),
        })
    }

    /// Decodes a whole command list.
    pub fn decode_all<B: AsRef<[u8]>>(raw: &[B]) -> Result<Vec<Command>, VMError> {
        raw.iter()
            .enumerate()
            .map(|(i, r)| Command::decode(i, r.as_ref()))
            .collect()
    }

    pub fn encode(&self) -> [u8; COMMAND_SIZE] {
        let mut out = [0u8; COMMAND_SIZE];
        out[0..4].copy_from_slice(&self.selector);
        out[4] = self.flags;
        out[5..11].copy_from_slice(&self.args);
        out[11] = self.output;
        out[12..32].copy_from_slice(&self.target.0);
        out
    }

    pub const fn call_kind(&self) -> CallKind {
        CallKind::from_flags(self.flags)
    }

    pub const fn tuple_return(&self) -> bool {
        self.flags & FLAG_TUPLE_RETURN != 0
    }

    pub const fn state_input(&self) -> bool {
        self.flags & FLAG_STATE_INPUT != 0
    }

    pub const fn abi_tail(&self) -> bool {
        self.flags & FLAG_ABI_TAIL != 0
    }

    pub fn is_fallback(&self) -> bool {
        self.selector == FALLBACK_SELECTOR
    }

    /// Argument references up to the first end marker.
    pub fn args(&self) -> impl Iterator<Item = Arg> + '_ {
        self.args.iter().map_while(|&b| Arg::from_byte(b))
    }

    pub const fn output(&self) -> Output {
        Output::from_byte(self.output)
    }
}

/// Assembler spelling: `sN`, `dN` or `state`.
impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Static(i) => write!(f, "s{i}"),
            Arg::Dynamic(i) => write!(f, "d{i}"),
            Arg::State => f.write_str("state"),
        }
    }
}

/// Assembler spelling: `sN`, `dN`, `state` or `_`.
impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Discard => f.write_str("_"),
            Output::ReplaceState => f.write_str("state"),
            Output::Static(i) => write!(f, "s{i}"),
            Output::Dynamic(i) => write!(f, "d{i}"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} 0x{}",
            self.call_kind(),
            self.target,
            crate::types::hex::encode(&self.selector)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(hex: &str) -> Vec<u8> {
        crate::types::hex::decode(hex).unwrap()
    }

    #[test]
    fn selector_of_known_signatures() {
        assert_eq!(selector_of("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector_of("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn decodes_fields_in_order() {
        // transfer(address,uint256) as a standard call on slots 0 and 1, output discarded
        let bytes = raw(
            "a9059cbb010001ffffffffff\
             f39fd6e51aad88f6f4ce6ab8827279cfffb92266",
        );
        assert_eq!(bytes.len(), COMMAND_SIZE);
        let cmd = Command::decode(0, &bytes).unwrap();
        assert_eq!(cmd.selector, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(cmd.call_kind(), CallKind::Call);
        assert_eq!(cmd.args().collect::<Vec<_>>(), vec![Arg::Static(0), Arg::Static(1)]);
        assert_eq!(cmd.output(), Output::Discard);
        assert_eq!(
            cmd.target.to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(cmd.encode().to_vec(), bytes);
    }

    #[test]
    fn wrong_length_is_malformed() {
        assert!(matches!(
            Command::decode(3, &[0u8; 31]),
            Err(VMError::MalformedCommand {
                index: 3,
                length: 31
            })
        ));
        assert!(matches!(
            Command::decode_all(&[vec![0u8; 32], vec![0u8; 33]]),
            Err(VMError::MalformedCommand { index: 1, .. })
        ));
    }

    #[test]
    fn every_pattern_decodes() {
        let cmd = Command::decode(0, &[0xffu8; 32]).unwrap();
        assert_eq!(cmd.call_kind(), CallKind::Value);
        assert!(cmd.tuple_return());
        assert!(cmd.state_input());
        assert_eq!(cmd.args().count(), 0);
        assert_eq!(cmd.output(), Output::Discard);
    }

    #[test]
    fn argument_tags() {
        assert_eq!(Arg::from_byte(0x05), Some(Arg::Static(5)));
        assert_eq!(Arg::from_byte(0x85), Some(Arg::Dynamic(5)));
        assert_eq!(Arg::from_byte(0xfe), Some(Arg::State));
        assert_eq!(Arg::from_byte(0xff), None);
        for arg in [Arg::Static(7), Arg::Dynamic(125), Arg::State] {
            assert_eq!(Arg::from_byte(arg.to_byte()), Some(arg));
        }
    }

    #[test]
    fn output_tags() {
        assert_eq!(Output::from_byte(0xff), Output::Discard);
        assert_eq!(Output::from_byte(0xfe), Output::ReplaceState);
        assert_eq!(Output::from_byte(0x81), Output::Dynamic(1));
        assert_eq!(Output::from_byte(0x01), Output::Static(1));
    }

    #[test]
    fn args_stop_at_first_end_marker() {
        let mut cmd = Command::new(CallKind::Call, [0; 4], Address::zero());
        cmd.args = [0x00, 0xff, 0x01, 0x02, 0xff, 0xff];
        assert_eq!(cmd.args().collect::<Vec<_>>(), vec![Arg::Static(0)]);
    }

    #[test]
    fn builder_sets_flags_and_fields() {
        let cmd = Command::new(CallKind::Static, [1, 2, 3, 4], Address::from_low_u8(9))
            .with_args(&[Arg::Dynamic(2), Arg::State])
            .with_output(Output::Dynamic(3))
            .with_flags(FLAG_TUPLE_RETURN);
        let decoded = Command::decode(0, &cmd.encode()).unwrap();
        assert_eq!(decoded, cmd);
        assert_eq!(decoded.call_kind(), CallKind::Static);
        assert!(decoded.tuple_return());
        assert!(!decoded.is_fallback());
        assert_eq!(decoded.args[..3], [0x82, 0xfe, 0xff]);
    }
}
