//! Allocation of structure-element ID tree keys.
//!
//! Keys follow one fixed textual scheme, `node` followed by an 8 digit
//! zero-padded counter (`node00000042`). The allocator keeps the counter as a
//! number and only renders it when a key is inserted into the tree.

use crate::error::ComposerError;

pub const ID_PREFIX: &str = "node";
pub const ID_DIGITS: usize = 8;

const MAX_COUNTER: u64 = 99_999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    /// Continues the sequence after `key`, the greatest key currently in the tree.
    pub fn after_key(key: &[u8]) -> Result<Self, ComposerError> {
        let counter = parse_key(key).ok_or_else(|| ComposerError::IncompatibleIdScheme {
            key: String::from_utf8_lossy(key).into_owned(),
        })?;
        Ok(Self { next: counter + 1 })
    }

    /// The counter the next key will carry.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// How many more keys fit before the counter outgrows its 8 digits.
    pub fn remaining(&self) -> u64 {
        (MAX_COUNTER + 1).saturating_sub(self.next)
    }

    /// Fails unless `count` more keys can be allocated.
    pub fn reserve(&self, count: usize) -> Result<(), ComposerError> {
        let available = self.remaining();
        if count as u64 > available {
            return Err(ComposerError::IdSpaceExhausted { requested: count, available });
        }
        Ok(())
    }

    /// Renders the next key and advances the counter.
    ///
    /// Callers check capacity with [`IdAllocator::reserve`] first.
    pub fn next_key(&mut self) -> String {
        let key = format_key(self.next);
        self.next += 1;
        key
    }
}

pub fn format_key(counter: u64) -> String {
    format!("{}{:0width$}", ID_PREFIX, counter, width = ID_DIGITS)
}

/// Parses a key of the exact form `node` + 8 ASCII digits.
pub fn parse_key(key: &[u8]) -> Option<u64> {
    let digits = key.strip_prefix(ID_PREFIX.as_bytes())?;
    if digits.len() != ID_DIGITS || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}
