//! Opaque variable identifiers.
//!
//! A factor references the variables it constrains by [`Key`], never by
//! value. The optimizer's variable container maps keys back to current
//! estimates at linearization time, which keeps factors free of lifetime
//! coupling to variable storage.

use std::fmt;

/// Number of index bits in a symbol-packed key.
const INDEX_BITS: u32 = 56;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Opaque identifier for an optimization variable.
///
/// Plain integer keys work everywhere; [`Key::symbol`] packs a category
/// character and an index into one `u64` (`'x'` for poses, `'l'` for
/// landmarks by convention) so debug output stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u64);

impl Key {
    /// Create a key from a raw integer.
    pub fn new(id: u64) -> Self {
        Key(id)
    }

    /// Create a key from a category character and an index, e.g.
    /// `Key::symbol('x', 3)` for the fourth camera.
    ///
    /// The character occupies the top 8 bits, the index the remaining 56.
    pub fn symbol(chr: char, index: u64) -> Self {
        Key(((chr as u64) << INDEX_BITS) | (index & INDEX_MASK))
    }

    /// Raw integer value of the key.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Category character, if this key was symbol-packed.
    pub fn chr(&self) -> Option<char> {
        let c = (self.0 >> INDEX_BITS) as u8;
        c.is_ascii_alphabetic().then(|| c as char)
    }

    /// Index part of a symbol-packed key, or the raw value otherwise.
    pub fn index(&self) -> u64 {
        if self.chr().is_some() {
            self.0 & INDEX_MASK
        } else {
            self.0
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chr() {
            Some(c) => write!(f, "{}{}", c, self.index()),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<u64> for Key {
    fn from(id: u64) -> Self {
        Key(id)
    }
}
