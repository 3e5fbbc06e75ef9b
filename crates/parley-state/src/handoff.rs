//! Single-owner handoff slots.
//!
//! Conversation payloads move between a request, a parked entry and a
//! parent request. A [`Slot`] holds at most one payload: taking empties the
//! source, giving fills a destination that must be empty.

/// A place that holds at most one owned value.
#[derive(Debug)]
pub struct Slot<T>(Option<T>);

impl<T> Slot<T> {
    /// An empty slot.
    pub const fn empty() -> Self {
        Self(None)
    }

    /// A slot holding `value`.
    pub const fn with(value: T) -> Self {
        Self(Some(value))
    }

    /// Move the value out, leaving the slot empty.
    pub fn take(&mut self) -> Option<T> {
        self.0.take()
    }

    /// Move `value` into the slot.
    ///
    /// # Panics
    ///
    /// If the slot already holds a value. Take it out first.
    pub fn give(&mut self, value: T) {
        assert!(self.0.is_none(), "handoff into an occupied slot");
        self.0 = Some(value);
    }

    /// Whether the slot holds a value.
    pub fn is_occupied(&self) -> bool {
        self.0.is_some()
    }

    /// Whether the slot is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the held value.
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Mutably borrow the held value.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.0.as_mut()
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_empties_source() {
        let mut slot = Slot::with(5);
        assert_eq!(slot.take(), Some(5));
        assert!(slot.is_empty());
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_give_fills_destination() {
        let mut source = Slot::with(String::from("payload"));
        let mut dest = Slot::empty();

        let value = source.take().unwrap();
        dest.give(value);

        assert!(source.is_empty());
        assert_eq!(dest.get().map(String::as_str), Some("payload"));
    }

    #[test]
    #[should_panic(expected = "handoff into an occupied slot")]
    fn test_give_into_occupied_slot_panics() {
        let mut slot = Slot::with(1);
        slot.give(2);
    }

    #[test]
    fn test_take_then_give_swaps() {
        let mut slot = Slot::with("old");
        let old = slot.take();
        slot.give("new");
        assert_eq!(old, Some("old"));
        assert_eq!(slot.get(), Some(&"new"));
    }
}
