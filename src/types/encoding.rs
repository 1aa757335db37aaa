//! Little-endian binary codec used for serialized scripts.
//!
//! # Binary Format
//!
//! - Integers: little-endian, fixed-width
//! - `usize`: encoded as `u64` for portability
//! - `Vec<T>`: 8-byte length prefix followed by elements
//! - Arrays `[T; N]`: elements back to back, no length prefix

/// Sink for writing encoded bytes.
pub trait EncodeSink {
    fn write(&mut self, bytes: &[u8]);
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Types that can be serialized to the binary format.
pub trait Encode {
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Serializes into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Errors that can occur during decoding.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before expected data was read.
    UnexpectedEof,
    /// Length prefix exceeds what the input can hold.
    LengthOverflow,
    /// Bytes remained after the value was fully decoded.
    TrailingBytes,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnexpectedEof => write!(f, "unexpected end of input"),
            DecodeError::LengthOverflow => write!(f, "length prefix overflow"),
            DecodeError::TrailingBytes => write!(f, "trailing bytes"),
        }
    }
}

/// Types that can be deserialized from the binary format.
pub trait Decode: Sized {
    /// Decodes a value and advances `input` past the consumed bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decodes a value that must consume all of `data`.
    fn from_slice(data: &[u8]) -> Result<Self, DecodeError> {
        let mut input = data;
        let value = Self::decode(&mut input)?;
        if !input.is_empty() {
            return Err(DecodeError::TrailingBytes);
        }
        Ok(value)
    }
}

/// Reads exactly `n` bytes from the input, advancing the slice.
fn read_bytes<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    let (bytes, rest) = input.split_at(n);
    *input = rest;
    Ok(bytes)
}

impl Encode for u8 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self]);
    }
}

impl Decode for u8 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(read_bytes(input, 1)?[0])
    }
}

impl Encode for u64 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.to_le_bytes());
    }
}

impl Decode for u64 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(read_bytes(input, 8)?);
        Ok(u64::from_le_bytes(buf))
    }
}

impl Encode for usize {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u64).encode(out);
    }
}

impl Decode for usize {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        usize::try_from(u64::decode(input)?).map_err(|_| DecodeError::LengthOverflow)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = usize::decode(input)?;
        // Every element takes at least one byte, so a larger prefix is corrupt.
        if len > input.len() {
            return Err(DecodeError::LengthOverflow);
        }
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(T::decode(input)?);
        }
        Ok(out)
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(self);
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(read_bytes(input, N)?);
        Ok(out)
    }
}
