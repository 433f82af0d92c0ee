//! Fixed-capacity ring of optional slots addressed by logical index.
//!
//! Both protocol entities track positions as monotonically increasing
//! `u64` logical indices. The ring maps them onto physical slots with
//! `index % capacity`, so wraparound never leaks into protocol code.
//!
//! Live range is `[head, tail)`. Slots inside it may be empty (a released
//! send slot, a receive slot whose packet has not arrived yet). Slots
//! outside it are always empty.

use crate::error::ArqError;

/// Ring buffer of `Option<T>` slots.
#[derive(Debug, Clone)]
pub struct SlotRing<T> {
    slots: Box<[Option<T>]>,
    head: u64,
    len: usize,
}

impl<T> SlotRing<T> {
    /// Creates an empty ring.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= 1, "ring capacity must be at least 1");
        let slots = std::iter::repeat_with(|| None).take(capacity).collect();
        Self { slots, head: 0, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Length of the live range `[head, tail)`.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Logical index of the oldest slot.
    pub fn head(&self) -> u64 {
        self.head
    }

    /// Logical index one past the newest slot.
    pub fn tail(&self) -> u64 {
        self.head + self.len as u64
    }

    fn physical(&self, index: u64) -> Result<usize, ArqError> {
        let capacity = self.capacity();
        if index < self.head || index - self.head >= capacity as u64 {
            return Err(ArqError::RingIndexOutOfRange { index, head: self.head, capacity });
        }
        Ok((index % capacity as u64) as usize)
    }

    /// Appends a value at the tail and returns its logical index.
    pub fn push(&mut self, value: T) -> Result<u64, ArqError> {
        if self.is_full() {
            return Err(ArqError::RingFull { capacity: self.capacity() });
        }
        let index = self.tail();
        let slot = self.physical(index)?;
        self.slots[slot] = Some(value);
        self.len += 1;
        Ok(index)
    }

    /// Stores a value at any index in `[head, head + capacity)`, extending
    /// the live range if needed. Returns the previous occupant.
    pub fn place(&mut self, index: u64, value: T) -> Result<Option<T>, ArqError> {
        let slot = self.physical(index)?;
        let previous = self.slots[slot].replace(value);
        if index >= self.tail() {
            self.len = (index - self.head + 1) as usize;
        }
        Ok(previous)
    }

    /// Value at `index`, if the slot is live and occupied.
    pub fn get(&self, index: u64) -> Option<&T> {
        if index >= self.tail() {
            return None;
        }
        let slot = self.physical(index).ok()?;
        self.slots[slot].as_ref()
    }

    pub fn occupied(&self, index: u64) -> bool {
        self.get(index).is_some()
    }

    /// Empties the slot at `index` without moving the head.
    pub fn release(&mut self, index: u64) -> Result<Option<T>, ArqError> {
        let slot = self.physical(index)?;
        if index >= self.tail() {
            return Ok(None);
        }
        Ok(self.slots[slot].take())
    }

    pub fn front_occupied(&self) -> bool {
        self.occupied(self.head)
    }

    /// Removes the head slot, occupied or not.
    ///
    /// Returns `None` when the live range is empty, otherwise the slot's
    /// former content.
    pub fn pop_front(&mut self) -> Option<Option<T>> {
        if self.is_empty() {
            return None;
        }
        let slot = (self.head % self.capacity() as u64) as usize;
        let value = self.slots[slot].take();
        self.head += 1;
        self.len -= 1;
        Some(value)
    }

    /// Removes and returns the head value if its slot is occupied.
    pub fn pop_occupied(&mut self) -> Option<T> {
        if !self.front_occupied() {
            return None;
        }
        self.pop_front().flatten()
    }
}
