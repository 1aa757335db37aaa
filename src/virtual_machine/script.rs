//! Serialized command lists.
//!
//! A [`Script`] bundles a command list with the initial state it runs on. The
//! binary form is:
//!
//! ```text
//! "OPCHN" | version(3) | commands: u64 count, 32 bytes each
//!         | state: u64 count, (u64 length, bytes) each
//! ```
//!
//! Integers are little-endian. A script is either this binary form or assembly
//! text; [`Script::load`] tells them apart by the magic.

use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use crate::virtual_machine::assembler::{AsmContext, assemble_source_with};
use crate::virtual_machine::command::{COMMAND_SIZE, Command};
use crate::virtual_machine::errors::VMError;
use std::fs;
use std::path::Path;

/// Magic bytes identifying a serialized script.
const MAGIC: &[u8; 5] = b"OPCHN";

/// Current script format version.
const CURRENT_VERSION: Version = Version::new(1, 0, 0);

#[derive(Debug, PartialEq, Eq)]
struct Version {
    major: u8,
    minor: u8,
    patch: u8,
}

impl Version {
    const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Encode for Version {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[self.major, self.minor, self.patch]);
    }
}

impl Decode for Version {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let [major, minor, patch] = <[u8; 3]>::decode(input)?;
        Ok(Version::new(major, minor, patch))
    }
}

/// A command list and its initial state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    pub commands: Vec<[u8; COMMAND_SIZE]>,
    pub state: Vec<Vec<u8>>,
}

impl Script {
    pub fn new(commands: &[Command], state: Vec<Vec<u8>>) -> Self {
        Self {
            commands: commands.iter().map(Command::encode).collect(),
            state,
        }
    }

    /// Decodes every command record.
    pub fn decode_commands(&self) -> Result<Vec<Command>, VMError> {
        Command::decode_all(&self.commands)
    }

    /// Serializes the script with magic header and version.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        MAGIC.encode(&mut out);
        CURRENT_VERSION.encode(&mut out);
        self.commands.encode(&mut out);
        self.state.encode(&mut out);
        out
    }

    /// Deserializes a script, rejecting other versions and trailing data.
    pub fn from_bytes(mut input: &[u8]) -> Result<Self, VMError> {
        if input.len() < MAGIC.len() {
            return Err(VMError::DecodeError {
                reason: "truncated".to_string(),
            });
        }

        if &<[u8; 5]>::decode(&mut input)? != MAGIC {
            return Err(VMError::DecodeError {
                reason: "bad magic".to_string(),
            });
        }

        if Version::decode(&mut input)? != CURRENT_VERSION {
            return Err(VMError::DecodeError {
                reason: "unsupported version".to_string(),
            });
        }

        let commands = Vec::<[u8; COMMAND_SIZE]>::decode(&mut input)?;
        let state = Vec::<Vec<u8>>::decode(&mut input)?;
        if !input.is_empty() {
            return Err(VMError::DecodeError {
                reason: "trailing bytes".to_string(),
            });
        }
        Ok(Self { commands, state })
    }

    /// Whether `data` starts like a binary script.
    pub fn is_binary(data: &[u8]) -> bool {
        data.starts_with(MAGIC)
    }

    /// Reads a binary or text script from `path`.
    ///
    /// Text is assembled with `ctx`, which supplies the known `@alias` names.
    pub fn load<P: AsRef<Path>>(path: P, ctx: AsmContext) -> Result<Self, VMError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if Self::is_binary(&data) {
            return Self::from_bytes(&data);
        }
        let source = String::from_utf8(data).map_err(|_| VMError::DecodeError {
            reason: "script is neither binary nor UTF-8 text".to_string(),
        })?;
        assemble_source_with(&source, &path.display().to_string(), ctx)
    }

    /// Writes the binary form to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::address::Address;
    use crate::virtual_machine::command::{Arg, Output};
    use crate::virtual_machine::dispatch::CallKind;

    fn sample() -> Script {
        let add = Command::new(CallKind::Call, [1, 2, 3, 4], Address::from_low_u8(7))
            .with_args(&[Arg::Static(0), Arg::Static(1)])
            .with_output(Output::Static(2));
        Script::new(&[add, add], vec![vec![1; 32], b"two".to_vec()])
    }

    #[test]
    fn binary_round_trip() {
        let script = sample();
        let bytes = script.to_bytes();
        assert!(Script::is_binary(&bytes));
        assert_eq!(Script::from_bytes(&bytes).unwrap(), script);
        assert_eq!(script.decode_commands().unwrap().len(), 2);
    }

    #[test]
    fn header_layout() {
        let bytes = Script::default().to_bytes();
        assert_eq!(&bytes[..5], b"OPCHN");
        assert_eq!(&bytes[5..8], &[1, 0, 0]);
        assert_eq!(bytes.len(), 8 + 8 + 8);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Script::from_bytes(&bytes),
            Err(VMError::DecodeError { reason }) if reason == "bad magic"
        ));
    }

    #[test]
    fn rejects_other_versions() {
        let mut bytes = sample().to_bytes();
        bytes[5] = 9;
        assert!(matches!(
            Script::from_bytes(&bytes),
            Err(VMError::DecodeError { reason }) if reason == "unsupported version"
        ));
    }

    #[test]
    fn rejects_trailing_and_truncated_data() {
        let mut bytes = sample().to_bytes();
        bytes.push(0);
        assert!(Script::from_bytes(&bytes).is_err());
        let bytes = sample().to_bytes();
        assert!(Script::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(Script::from_bytes(b"OPC").is_err());
    }

    #[test]
    fn load_and_save_files() {
        let dir = std::env::temp_dir().join(format!("opchain-script-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let bin = dir.join("sample.opc");
        sample().save(&bin).unwrap();
        assert_eq!(Script::load(&bin, AsmContext::new()).unwrap(), sample());

        let text = dir.join("sample.asm");
        fs::write(&text, "slot u256 1\nslot str \"hi\"\n").unwrap();
        let script = Script::load(&text, AsmContext::new()).unwrap();
        assert_eq!(script.state.len(), 2);
        assert!(script.commands.is_empty());

        assert!(matches!(
            Script::load(dir.join("missing"), AsmContext::new()),
            Err(VMError::IoError { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
