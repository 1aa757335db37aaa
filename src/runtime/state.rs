//! Key-value storage behind the host and its per-frame write buffers.
//!
//! [`State`] is the storage interface every call frame sees. A frame never
//! writes to its parent directly: it gets an [`OverlayState`] that buffers
//! writes and reads through to the parent, and the parent applies the buffered
//! writes only if the frame succeeds.

use crate::types::word::Word;
use std::collections::BTreeMap;

/// Pending writes of one overlay: `Some(value)` for stores, `None` for deletions.
pub type Writes = Vec<(Word, Option<Vec<u8>>)>;

/// Key-value storage interface for a call frame.
pub trait State {
    /// Retrieves a value by key, returning `None` if the key does not exist.
    fn get(&self, key: Word) -> Option<Vec<u8>>;
    /// Stores a key-value pair, overwriting any existing value.
    fn push(&mut self, key: Word, value: Vec<u8>);
    /// Removes a key from storage.
    fn delete(&mut self, key: Word);

    /// Applies the writes of a finished overlay.
    fn commit(&mut self, writes: Writes) {
        for (key, value) in writes {
            match value {
                Some(value) => self.push(key, value),
                None => self.delete(key),
            }
        }
    }
}

/// Write buffer on top of a base storage.
pub struct OverlayState<'a> {
    base: &'a dyn State,
    writes: BTreeMap<Word, Option<Vec<u8>>>,
}

impl<'a> OverlayState<'a> {
    pub fn new(base: &'a dyn State) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Consumes the overlay and returns the pending writes in key order.
    pub fn into_writes(self) -> Writes {
        self.writes.into_iter().collect()
    }
}

impl State for OverlayState<'_> {
    fn get(&self, key: Word) -> Option<Vec<u8>> {
        if let Some(v) = self.writes.get(&key) {
            return v.clone();
        }
        self.base.get(key)
    }

    fn push(&mut self, key: Word, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: Word) {
        self.writes.insert(key, None);
    }
}

/// Plain in-memory storage, the root of every overlay chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryState {
    data: BTreeMap<Word, Vec<u8>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Vec<(Word, Vec<u8>)>) -> Self {
        Self {
            data: data.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl State for MemoryState {
    fn get(&self, key: Word) -> Option<Vec<u8>> {
        self.data.get(&key).cloned()
    }

    fn push(&mut self, key: Word, value: Vec<u8>) {
        self.data.insert(key, value);
    }

    fn delete(&mut self, key: Word) {
        self.data.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(s: &[u8]) -> Word {
        Word::keccak(s)
    }

    #[test]
    fn overlay_reads_through_to_base() {
        let base = MemoryState::with_data(vec![(k(b"key"), b"value".to_vec())]);
        let overlay = OverlayState::new(&base);
        assert_eq!(overlay.get(k(b"key")), Some(b"value".to_vec()));
        assert_eq!(overlay.get(k(b"missing")), None);
        assert!(overlay.is_empty());
    }

    #[test]
    fn overlay_write_shadows_base() {
        let base = MemoryState::with_data(vec![(k(b"key"), b"old".to_vec())]);
        let mut overlay = OverlayState::new(&base);
        overlay.push(k(b"key"), b"new".to_vec());
        assert_eq!(overlay.get(k(b"key")), Some(b"new".to_vec()));
        assert_eq!(base.get(k(b"key")), Some(b"old".to_vec()));
    }

    #[test]
    fn overlay_delete_hides_base_value() {
        let base = MemoryState::with_data(vec![(k(b"key"), b"value".to_vec())]);
        let mut overlay = OverlayState::new(&base);
        overlay.delete(k(b"key"));
        assert_eq!(overlay.get(k(b"key")), None);
    }

    #[test]
    fn nested_overlays_commit_upwards() {
        let mut base = MemoryState::new();
        let writes = {
            let mut outer = OverlayState::new(&base);
            outer.push(k(b"a"), b"1".to_vec());
            let inner_writes = {
                let mut inner = OverlayState::new(&outer);
                assert_eq!(inner.get(k(b"a")), Some(b"1".to_vec()));
                inner.push(k(b"b"), b"2".to_vec());
                inner.into_writes()
            };
            outer.commit(inner_writes);
            outer.into_writes()
        };
        base.commit(writes);
        assert_eq!(base.get(k(b"a")), Some(b"1".to_vec()));
        assert_eq!(base.get(k(b"b")), Some(b"2".to_vec()));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn commit_applies_deletions() {
        let mut base = MemoryState::with_data(vec![(k(b"gone"), b"x".to_vec())]);
        base.commit(vec![(k(b"gone"), None), (k(b"new"), Some(b"y".to_vec()))]);
        assert_eq!(base.get(k(b"gone")), None);
        assert_eq!(base.get(k(b"new")), Some(b"y".to_vec()));
    }

    #[test]
    fn discarded_overlay_leaves_base_untouched() {
        let base = MemoryState::new();
        let mut overlay = OverlayState::new(&base);
        overlay.push(k(b"a"), b"1".to_vec());
        drop(overlay);
        assert!(base.is_empty());
    }
}
