//! Fixed-capacity circular history.
//!
//! [`HistoryBuffer`] keeps the most recent `capacity` entries in
//! chronological order, overwriting the oldest slot once full.

use crate::error::ConfigError;

/// Circular buffer of the most recent entries.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    /// Backing storage; grows up to `capacity` then is overwritten in place.
    slots: Vec<T>,
    capacity: usize,
    /// Index of the logically oldest entry once the buffer has wrapped.
    head: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    /// Create an empty buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        })
    }

    /// Append an entry, evicting the oldest one when full.
    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
        } else {
            self.slots[self.head] = item;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Copy of all entries, oldest first.
    pub fn get_all(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Copy of the newest `n` entries (or fewer), oldest first.
    pub fn tail(&self, n: usize) -> Vec<T> {
        let skip = self.slots.len().saturating_sub(n);
        self.iter().skip(skip).cloned().collect()
    }

    /// Most recently pushed entry.
    pub fn last(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots.get(idx)
    }

    /// Iterate entries in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Drop all entries. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
