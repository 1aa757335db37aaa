//! Value encoding layer: head/tail ABI framing for call inputs and returns.
//!
//! A call buffer is a head segment with one word per argument followed by a
//! tail segment. Static values sit inline in the head; dynamic values put an
//! offset word (relative to the start of the head) in the head and their
//! length-prefixed, zero-padded payload in the tail.
//!
//! Slots store dynamic values as raw content bytes, so the framing happens
//! here, at the boundary between the state vector and a call buffer. Commands
//! carrying the ABI-tail flag instead keep a value's whole tail in the slot
//! (count or length word first), which is how dynamic arrays travel.

use crate::types::word::{WORD_LEN, Word};
use crate::virtual_machine::errors::VMError;

/// Size of one ABI word.
pub const WORD_SIZE: usize = WORD_LEN;

/// One value to be laid out in a call buffer.
#[derive(Clone, Copy, Debug)]
pub enum Token<'a> {
    /// A static 32-byte word, copied verbatim into the head.
    Word(&'a [u8; WORD_SIZE]),
    /// `bytes` / `string`: length-prefixed content in the tail.
    Bytes(&'a [u8]),
    /// `bytes[]`: element count, element offsets, then each element as `bytes`.
    BytesArray(&'a [Vec<u8>]),
    /// `uint256[]` and other static-element arrays: count, then the words.
    Words(&'a [Word]),
    /// An already encoded tail, spliced in verbatim and padded to a word.
    Tail(&'a [u8]),
}

/// Rounds `len` up to a whole number of words.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD_SIZE) * WORD_SIZE
}

/// Lays out `tokens` as a head/tail buffer and appends it to `out`.
pub fn encode_tokens_into(out: &mut Vec<u8>, tokens: &[Token<'_>]) {
    let head_len = tokens.len() * WORD_SIZE;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for token in tokens {
        match token {
            Token::Word(word) => head.extend_from_slice(&word[..]),
            dynamic => {
                head.extend_from_slice(&Word::from_usize(head_len + tail.len()).0);
                write_tail(&mut tail, dynamic);
            }
        }
    }
    out.extend(head);
    out.extend(tail);
}

/// Lays out `tokens` as a fresh head/tail buffer.
pub fn encode_tokens(tokens: &[Token<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_tokens_into(&mut out, tokens);
    out
}

fn write_tail(tail: &mut Vec<u8>, token: &Token<'_>) {
    match token {
        Token::Word(word) => tail.extend_from_slice(&word[..]),
        Token::Bytes(content) => {
            tail.extend_from_slice(&Word::from_usize(content.len()).0);
            tail.extend_from_slice(content);
            tail.resize(tail.len() + padded_len(content.len()) - content.len(), 0);
        }
        Token::BytesArray(items) => {
            tail.extend_from_slice(&Word::from_usize(items.len()).0);
            let elements: Vec<Token<'_>> = items.iter().map(|i| Token::Bytes(i)).collect();
            encode_tokens_into(tail, &elements);
        }
        Token::Words(words) => {
            tail.extend_from_slice(&Word::from_usize(words.len()).0);
            for word in words.iter() {
                tail.extend_from_slice(&word.0);
            }
        }
        Token::Tail(encoded) => {
            tail.extend_from_slice(encoded);
            tail.resize(tail.len() + padded_len(encoded.len()) - encoded.len(), 0);
        }
    }
}

/// `abi.encode(bytes)`: offset word, length word, padded content.
pub fn encode_bytes(content: &[u8]) -> Vec<u8> {
    encode_tokens(&[Token::Bytes(content)])
}

/// `abi.encode(bytes[])`.
pub fn encode_bytes_array(items: &[Vec<u8>]) -> Vec<u8> {
    encode_tokens(&[Token::BytesArray(items)])
}

/// `abi.encode(uint256[])`.
pub fn encode_words(words: &[Word]) -> Vec<u8> {
    encode_tokens(&[Token::Words(words)])
}

/// Returns the word starting at byte `offset`.
fn word_at_offset(data: &[u8], offset: usize, what: &'static str) -> Result<Word, VMError> {
    let end = offset.checked_add(WORD_SIZE).ok_or(VMError::EncodingMismatch {
        what,
        needed: usize::MAX,
        available: data.len(),
    })?;
    data.get(offset..end)
        .and_then(Word::from_slice)
        .ok_or(VMError::EncodingMismatch {
            what,
            needed: end,
            available: data.len(),
        })
}

/// Reads a word that must hold a length or offset.
fn usize_at_offset(data: &[u8], offset: usize, what: &'static str) -> Result<usize, VMError> {
    word_at_offset(data, offset, what)?
        .to_usize()
        .ok_or(VMError::EncodingMismatch {
            what,
            needed: usize::MAX,
            available: data.len(),
        })
}

/// Bounds-checked `data[start..start + len]`.
fn slice_at<'a>(
    data: &'a [u8],
    start: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], VMError> {
    let end = start.checked_add(len).ok_or(VMError::EncodingMismatch {
        what,
        needed: usize::MAX,
        available: data.len(),
    })?;
    data.get(start..end).ok_or(VMError::EncodingMismatch {
        what,
        needed: end,
        available: data.len(),
    })
}

/// Returns head word `index` of an encoded buffer.
pub fn word_at(data: &[u8], index: usize) -> Result<Word, VMError> {
    word_at_offset(data, index * WORD_SIZE, "static word")
}

/// Resolves the tail position of the dynamic value referenced by head word `index`.
fn tail_offset(data: &[u8], index: usize, what: &'static str) -> Result<usize, VMError> {
    usize_at_offset(data, index * WORD_SIZE, what)
}

/// Reads `bytes` content whose length word sits at `offset`.
fn bytes_at_offset(data: &[u8], offset: usize, what: &'static str) -> Result<Vec<u8>, VMError> {
    let len = usize_at_offset(data, offset, what)?;
    Ok(slice_at(data, offset + WORD_SIZE, len, what)?.to_vec())
}

/// Decodes the `bytes` value referenced by head word `index`.
pub fn decode_bytes_at(data: &[u8], index: usize) -> Result<Vec<u8>, VMError> {
    let offset = tail_offset(data, index, "dynamic value")?;
    bytes_at_offset(data, offset, "dynamic value")
}

/// `abi.decode(data, (bytes))`.
pub fn decode_bytes(data: &[u8]) -> Result<Vec<u8>, VMError> {
    decode_bytes_at(data, 0)
}

/// Decodes the `bytes[]` value referenced by head word `index`.
pub fn decode_bytes_array_at(data: &[u8], index: usize) -> Result<Vec<Vec<u8>>, VMError> {
    const WHAT: &str = "bytes array";
    let offset = tail_offset(data, index, WHAT)?;
    let count = usize_at_offset(data, offset, WHAT)?;
    let base = offset + WORD_SIZE;
    // The offset table alone must fit before allocating for it.
    let table = count.checked_mul(WORD_SIZE).ok_or(VMError::EncodingMismatch {
        what: WHAT,
        needed: usize::MAX,
        available: data.len(),
    })?;
    let items = slice_at(data, base, table, WHAT)?;
    (0..count)
        .map(|i| {
            let rel = usize_at_offset(items, i * WORD_SIZE, WHAT)?;
            let at = base.checked_add(rel).ok_or(VMError::EncodingMismatch {
                what: WHAT,
                needed: usize::MAX,
                available: data.len(),
            })?;
            bytes_at_offset(data, at, WHAT)
        })
        .collect()
}

/// Decodes the `uint256[]` value referenced by head word `index`.
pub fn decode_words_at(data: &[u8], index: usize) -> Result<Vec<Word>, VMError> {
    const WHAT: &str = "word array";
    let offset = tail_offset(data, index, WHAT)?;
    let count = usize_at_offset(data, offset, WHAT)?;
    let len = count.checked_mul(WORD_SIZE).ok_or(VMError::EncodingMismatch {
        what: WHAT,
        needed: usize::MAX,
        available: data.len(),
    })?;
    let body = slice_at(data, offset + WORD_SIZE, len, WHAT)?;
    Ok(body.chunks(WORD_SIZE).filter_map(Word::from_slice).collect())
}

/// Returns the tail of the single dynamic value in `data`, starting at its
/// count or length word and running to the end of the buffer.
pub fn decode_tail(data: &[u8]) -> Result<Vec<u8>, VMError> {
    const WHAT: &str = "dynamic tail";
    let offset = tail_offset(data, 0, WHAT)?;
    // The tail must at least hold its own length word.
    slice_at(data, offset, WORD_SIZE, WHAT)?;
    Ok(data[offset..].to_vec())
}

/// `abi.decode(data, (bytes[]))`.
pub fn decode_bytes_array(data: &[u8]) -> Result<Vec<Vec<u8>>, VMError> {
    decode_bytes_array_at(data, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(n: u64) -> [u8; 32] {
        Word::from_u64(n).0
    }

    #[test]
    fn bytes_layout_matches_abi() {
        let encoded = encode_bytes(b"Hello");
        assert_eq!(encoded.len(), 96);
        assert_eq!(&encoded[..32], &word(32));
        assert_eq!(&encoded[32..64], &word(5));
        assert_eq!(&encoded[64..69], b"Hello");
        assert!(encoded[69..].iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_bytes_have_no_padding_words() {
        let encoded = encode_bytes(b"");
        assert_eq!(encoded.len(), 64);
        assert_eq!(decode_bytes(&encoded).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn mixed_static_and_dynamic_head() {
        // f(uint256, string, uint256): offsets are relative to the head start.
        let a = word(1);
        let b = word(2);
        let encoded = encode_tokens(&[Token::Word(&a), Token::Bytes(b"xy"), Token::Word(&b)]);
        assert_eq!(&encoded[..32], &a);
        assert_eq!(&encoded[32..64], &word(96));
        assert_eq!(&encoded[64..96], &b);
        assert_eq!(&encoded[96..128], &word(2));
        assert_eq!(&encoded[128..130], b"xy");
        assert_eq!(decode_bytes_at(&encoded, 1).unwrap(), b"xy".to_vec());
        assert_eq!(word_at(&encoded, 2).unwrap().0, b);
    }

    #[test]
    fn bytes_array_layout_matches_abi() {
        let items = vec![vec![0x11], vec![0x22, 0x33]];
        let encoded = encode_bytes_array(&items);
        // offset, count, two element offsets, two (len, padded word) pairs
        assert_eq!(encoded.len(), 32 * 8);
        assert_eq!(&encoded[32..64], &word(2));
        assert_eq!(&encoded[64..96], &word(64));
        assert_eq!(&encoded[96..128], &word(128));
        assert_eq!(decode_bytes_array(&encoded).unwrap(), items);
    }

    #[test]
    fn empty_bytes_array_round_trips() {
        let encoded = encode_bytes_array(&[]);
        assert_eq!(decode_bytes_array(&encoded).unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn short_return_data_is_mismatch() {
        assert!(matches!(
            decode_bytes(&[0u8; 16]),
            Err(VMError::EncodingMismatch { needed: 32, .. })
        ));
    }

    #[test]
    fn length_past_end_is_mismatch() {
        let mut encoded = encode_bytes(b"abc");
        encoded[63] = 200;
        assert!(matches!(
            decode_bytes(&encoded),
            Err(VMError::EncodingMismatch { .. })
        ));
    }

    #[test]
    fn huge_offset_is_mismatch() {
        let mut data = vec![0xffu8; 32];
        data.extend_from_slice(&word(0));
        assert!(matches!(
            decode_bytes(&data),
            Err(VMError::EncodingMismatch { .. })
        ));
    }

    #[test]
    fn word_array_layout_matches_abi() {
        let words = [Word::from_u64(1), Word::from_u64(2), Word::from_u64(3)];
        let encoded = encode_words(&words);
        assert_eq!(encoded.len(), 32 * 5);
        assert_eq!(&encoded[..32], &word(32));
        assert_eq!(&encoded[32..64], &word(3));
        assert_eq!(&encoded[128..160], &word(3));
        assert_eq!(decode_words_at(&encoded, 0).unwrap(), words.to_vec());
    }

    #[test]
    fn tail_keeps_count_word() {
        let encoded = encode_words(&[Word::from_u64(7), Word::from_u64(8)]);
        let tail = decode_tail(&encoded).unwrap();
        assert_eq!(tail, encoded[32..].to_vec());
        assert_eq!(&tail[..32], &word(2));

        // Splicing the tail back reproduces the original buffer.
        assert_eq!(encode_tokens(&[Token::Tail(&tail)]), encoded);
    }

    #[test]
    fn spliced_tail_is_word_padded() {
        let a = word(9);
        let encoded = encode_tokens(&[Token::Tail(&[1, 2, 3]), Token::Word(&a)]);
        assert_eq!(&encoded[..32], &word(64));
        assert_eq!(&encoded[32..64], &a);
        assert_eq!(&encoded[64..67], &[1, 2, 3]);
        assert_eq!(encoded.len(), 96);
    }

    #[test]
    fn tail_without_length_word_is_mismatch() {
        assert!(matches!(
            decode_tail(&word(32)),
            Err(VMError::EncodingMismatch { needed: 64, .. })
        ));
    }

    #[test]
    fn truncated_word_array_is_mismatch() {
        let mut encoded = encode_words(&[Word::from_u64(1), Word::from_u64(2)]);
        encoded.truncate(encoded.len() - 1);
        assert!(matches!(
            decode_words_at(&encoded, 0),
            Err(VMError::EncodingMismatch { .. })
        ));
    }

    #[test]
    fn huge_array_count_is_rejected_before_allocating() {
        let mut data = word(32).to_vec();
        data.extend_from_slice(&[0xffu8; 32]);
        assert!(decode_bytes_array(&data).is_err());
    }
}
