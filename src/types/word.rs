//! 32-byte words: the unit of static state slots and ABI heads.

use crate::types::address::{ADDRESS_LEN, Address};
use crate::types::hex;
use sha3::{Digest, Keccak256};
use std::fmt;

/// Word length in bytes.
pub const WORD_LEN: usize = 32;

/// A 32-byte big-endian word.
///
/// Integers, booleans, addresses and fixed bytes all travel as one word.
/// `Copy` so words can be moved between slots and call buffers freely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Word(pub [u8; WORD_LEN]);

impl Word {
    /// The all-zero word.
    pub const fn zero() -> Self {
        Word([0u8; WORD_LEN])
    }

    /// Returns the word as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates a word from a 32-byte slice, returning `None` on length mismatch.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; WORD_LEN] = bytes.try_into().ok()?;
        Some(Word(arr))
    }

    /// Keccak-256 digest of `data`.
    pub fn keccak(data: &[u8]) -> Self {
        Word(Keccak256::digest(data).into())
    }

    /// Keccak-256 over several byte strings concatenated.
    pub fn keccak_concat(parts: &[&[u8]]) -> Self {
        let mut hasher = Keccak256::new();
        for part in parts {
            hasher.update(part);
        }
        Word(hasher.finalize().into())
    }

    pub fn from_u64(n: u64) -> Self {
        Self::from_u128(n as u128)
    }

    pub fn from_u128(n: u128) -> Self {
        let mut out = [0u8; WORD_LEN];
        out[16..].copy_from_slice(&n.to_be_bytes());
        Word(out)
    }

    pub fn from_usize(n: usize) -> Self {
        Self::from_u64(n as u64)
    }

    pub fn from_bool(b: bool) -> Self {
        Self::from_u64(b as u64)
    }

    /// Left-pads an address into a word.
    pub fn from_address(addr: Address) -> Self {
        let mut out = [0u8; WORD_LEN];
        out[WORD_LEN - ADDRESS_LEN..].copy_from_slice(&addr.0);
        Word(out)
    }

    /// Returns the value if it fits in 128 bits.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|&b| b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// Returns the value if it fits in `usize`.
    pub fn to_usize(&self) -> Option<usize> {
        self.to_u128().and_then(|v| usize::try_from(v).ok())
    }

    /// Interprets the low 20 bytes as an address.
    pub fn to_address(&self) -> Address {
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&self.0[WORD_LEN - ADDRESS_LEN..]);
        Address(out)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// 256-bit unsigned addition, `None` on overflow.
    pub fn checked_add(&self, other: &Word) -> Option<Word> {
        let (a, b) = (self.limbs(), other.limbs());
        let mut out = [0u64; 4];
        let mut carry = false;
        for i in 0..4 {
            let (sum, c1) = a[i].overflowing_add(b[i]);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            out[i] = sum;
            carry = c1 || c2;
        }
        (!carry).then(|| Word::from_limbs(out))
    }

    /// 256-bit unsigned subtraction, `None` on underflow.
    pub fn checked_sub(&self, other: &Word) -> Option<Word> {
        let (a, b) = (self.limbs(), other.limbs());
        let mut out = [0u64; 4];
        let mut borrow = false;
        for i in 0..4 {
            let (diff, b1) = a[i].overflowing_sub(b[i]);
            let (diff, b2) = diff.overflowing_sub(borrow as u64);
            out[i] = diff;
            borrow = b1 || b2;
        }
        (!borrow).then(|| Word::from_limbs(out))
    }

    /// 256-bit unsigned multiplication, `None` on overflow.
    pub fn checked_mul(&self, other: &Word) -> Option<Word> {
        let (a, b) = (self.limbs(), other.limbs());
        // Schoolbook product into 8 limbs; anything above limb 3 is overflow.
        let mut wide = [0u64; 8];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 {
                let cur = wide[i + j] as u128 + (a[i] as u128) * (b[j] as u128) + carry;
                wide[i + j] = cur as u64;
                carry = cur >> 64;
            }
            wide[i + 4] = carry as u64;
        }
        if wide[4..].iter().any(|&l| l != 0) {
            return None;
        }
        Some(Word::from_limbs([wide[0], wide[1], wide[2], wide[3]]))
    }

    /// Little-endian u64 limbs (limb 0 is least significant).
    fn limbs(&self) -> [u64; 4] {
        let mut out = [0u64; 4];
        for (i, limb) in out.iter_mut().enumerate() {
            let start = WORD_LEN - (i + 1) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&self.0[start..start + 8]);
            *limb = u64::from_be_bytes(chunk);
        }
        out
    }

    fn from_limbs(limbs: [u64; 4]) -> Word {
        let mut out = [0u8; WORD_LEN];
        for (i, limb) in limbs.iter().enumerate() {
            let start = WORD_LEN - (i + 1) * 8;
            out[start..start + 8].copy_from_slice(&limb.to_be_bytes());
        }
        Word(out)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl From<Address> for Word {
    fn from(addr: Address) -> Self {
        Word::from_address(addr)
    }
}
