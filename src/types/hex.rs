//! Hex text helpers.

/// Lower-case hex encoding without a prefix.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Decodes hex text with an optional `0x` prefix.
///
/// Returns `None` on odd length or non-hex characters.
pub fn decode(text: &str) -> Option<Vec<u8>> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_lowercase() {
        assert_eq!(encode(&[0xde, 0xAD, 0x01]), "dead01");
    }

    #[test]
    fn decode_accepts_prefix() {
        assert_eq!(decode("0xdead01"), Some(vec![0xde, 0xad, 0x01]));
        assert_eq!(decode("DEAD"), Some(vec![0xde, 0xad]));
        assert_eq!(decode("0x"), Some(vec![]));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode("0xabc"), None);
        assert_eq!(decode("0xgg"), None);
    }
}
