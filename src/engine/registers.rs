//! The buffer register file.
//!
//! Rules communicate exclusively through a fixed set of numbered text slots.
//! Slots are 1-based: index 0 exists only to keep the arithmetic readable and
//! is never reachable through the public accessors.
//!
//! ```text
//! slots: [ <reserved> | $$1 | $$2 | ... | $$N ]
//!            0          1     2           N
//! ```
//!
//! Every write goes through [`normalize`], so everything the template engine
//! later splices around is plain ASCII with non-ASCII characters carried as
//! decimal character references (`é` -> `&#233;`).

use crate::error::{Result, ScraperError};
use std::borrow::Cow;

/// Default number of buffers.
pub const DEFAULT_BUFFER_COUNT: usize = 20;

/// Encode every non-ASCII character as a numeric XML character reference.
///
/// Returns the input unchanged (borrowed) when it is already ASCII.
pub fn normalize(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            out.push_str("&#");
            out.push_str(&(c as u32).to_string());
            out.push(';');
        }
    }
    Cow::Owned(out)
}

#[derive(Debug, Clone)]
pub struct Registers {
    slots: Vec<String>,
}

impl Registers {
    /// Create `count` empty buffers, addressable as `1..=count`.
    pub fn new(count: usize) -> Self {
        Registers { slots: vec![String::new(); count + 1] }
    }

    /// Number of addressable buffers.
    pub fn count(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn get(&self, index: usize) -> Result<&str> {
        self.check(index)?;
        Ok(&self.slots[index])
    }

    /// Store `value` in buffer `index`, replacing or appending to its content.
    pub fn set(&mut self, index: usize, value: &str, append: bool) -> Result<()> {
        self.check(index)?;
        let value = normalize(value);
        let slot = &mut self.slots[index];
        if append {
            log::trace!("set_buffer({index}) appending: {value}");
            slot.push_str(&value);
        } else {
            log::trace!("set_buffer({index}): {value}");
            slot.clear();
            slot.push_str(&value);
        }
        Ok(())
    }

    /// Reset every buffer to the empty string.
    pub fn clear_all(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    /// Iterate `(index, value)` from the highest buffer down to 1.
    ///
    /// Substitution must run in this order so that `$$1` never eats the
    /// prefix of `$$10`.
    pub(crate) fn iter_descending(&self) -> impl Iterator<Item = (usize, &str)> {
        (1..self.slots.len()).rev().map(move |i| (i, self.slots[i].as_str()))
    }

    fn check(&self, index: usize) -> Result<()> {
        if index == 0 || index >= self.slots.len() {
            return Err(ScraperError::BufferOutOfRange { index, max: self.count() });
        }
        Ok(())
    }
}

impl Default for Registers {
    fn default() -> Self {
        Registers::new(DEFAULT_BUFFER_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_indices_outside_range() {
        let mut regs = Registers::new(3);
        assert!(matches!(regs.get(0), Err(ScraperError::BufferOutOfRange { index: 0, max: 3 })));
        assert!(regs.get(4).is_err());
        assert!(regs.set(0, "x", false).is_err());
        assert!(regs.set(4, "x", true).is_err());
        assert!(regs.set(3, "x", false).is_ok());
    }

    #[test]
    fn append_and_replace() {
        let mut regs = Registers::default();
        regs.set(2, "a", false).unwrap();
        regs.set(2, "b", true).unwrap();
        assert_eq!(regs.get(2).unwrap(), "ab");
        regs.set(2, "c", false).unwrap();
        assert_eq!(regs.get(2).unwrap(), "c");
        regs.clear_all();
        assert_eq!(regs.get(2).unwrap(), "");
    }

    #[test]
    fn writes_are_normalized() {
        let mut regs = Registers::default();
        regs.set(1, "Amélie – 2001", false).unwrap();
        assert_eq!(regs.get(1).unwrap(), "Am&#233;lie &#8211; 2001");
        assert!(matches!(normalize("plain"), Cow::Borrowed("plain")));
    }

    proptest! {
        #[test]
        fn set_then_get_returns_normalized(index in 1usize..=20, value in "\\PC*") {
            let mut regs = Registers::default();
            regs.set(index, &value, false).unwrap();
            let expected = normalize(&value);
            prop_assert_eq!(regs.get(index).unwrap(), expected.as_ref());
            prop_assert!(regs.get(index).unwrap().is_ascii());
        }
    }
}
