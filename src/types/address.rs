//! 20-byte account addresses.

use crate::types::hex;
use std::fmt;
use std::str::FromStr;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Fixed-size 20-byte address identifying an account or contract.
///
/// `Copy` because addresses are passed around on every dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const fn zero() -> Self {
        Address([0u8; ADDRESS_LEN])
    }

    /// Builds an address whose last byte is `n` and all others zero.
    ///
    /// Handy for well-known system accounts.
    pub const fn from_low_u8(n: u8) -> Self {
        let mut out = [0u8; ADDRESS_LEN];
        out[ADDRESS_LEN - 1] = n;
        Address(out)
    }

    /// Returns the address as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates an address from a 20-byte slice, returning `None` on length mismatch.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().ok()?;
        Some(Address(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).ok_or_else(|| format!("invalid hex address '{s}'"))?;
        Address::from_slice(&bytes)
            .ok_or_else(|| format!("address '{s}' must be {ADDRESS_LEN} bytes"))
    }
}
