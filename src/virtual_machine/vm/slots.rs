use crate::types::word::WORD_LEN;
use crate::virtual_machine::command::MAX_STATE_SLOTS;
use crate::virtual_machine::errors::VMError;

/// The working state vector of one run.
///
/// Slots are untagged byte buffers: a slot is static or dynamic only in how a
/// command references it. The vector grows by appending outputs and can be
/// replaced wholesale, but never beyond [`MAX_STATE_SLOTS`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slots {
    slots: Vec<Vec<u8>>,
}

impl Slots {
    /// Takes ownership of an initial state.
    ///
    /// Returns [`VMError::StateTooLarge`] if it exceeds the slot ceiling.
    pub fn new(slots: Vec<Vec<u8>>) -> Result<Self, VMError> {
        check_size(slots.len())?;
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn as_slice(&self) -> &[Vec<u8>] {
        &self.slots
    }

    pub fn into_inner(self) -> Vec<Vec<u8>> {
        self.slots
    }

    /// Returns the raw bytes of slot `idx`.
    ///
    /// Returns [`VMError::SlotOutOfRange`] if `idx` is out of bounds.
    pub fn get(&self, idx: u8) -> Result<&[u8], VMError> {
        self.slots
            .get(idx as usize)
            .map(Vec::as_slice)
            .ok_or(VMError::SlotOutOfRange {
                slot: idx,
                available: self.slots.len(),
            })
    }

    /// Returns slot `idx` as a static word.
    ///
    /// Returns [`VMError::EncodingMismatch`] if the slot is not exactly 32 bytes.
    pub fn word(&self, idx: u8) -> Result<&[u8; WORD_LEN], VMError> {
        let bytes = self.get(idx)?;
        bytes.try_into().map_err(|_| VMError::EncodingMismatch {
            what: "static slot",
            needed: WORD_LEN,
            available: bytes.len(),
        })
    }

    /// Stores `value` into slot `idx`, appending when `idx` equals the length.
    pub fn set(&mut self, idx: u8, value: Vec<u8>) -> Result<(), VMError> {
        let idx_usize = idx as usize;
        match idx_usize.cmp(&self.slots.len()) {
            std::cmp::Ordering::Less => self.slots[idx_usize] = value,
            std::cmp::Ordering::Equal => {
                check_size(idx_usize + 1)?;
                self.slots.push(value);
            }
            std::cmp::Ordering::Greater => {
                return Err(VMError::SlotOutOfRange {
                    slot: idx,
                    available: self.slots.len(),
                });
            }
        }
        Ok(())
    }

    /// Replaces the whole vector.
    pub fn replace(&mut self, slots: Vec<Vec<u8>>) -> Result<(), VMError> {
        check_size(slots.len())?;
        self.slots = slots;
        Ok(())
    }
}

fn check_size(len: usize) -> Result<(), VMError> {
    if len > MAX_STATE_SLOTS {
        return Err(VMError::StateTooLarge {
            len,
            max: MAX_STATE_SLOTS,
        });
    }
    Ok(())
}
