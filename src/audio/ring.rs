//! Fixed-capacity circular buffer
//!
//! Holds the most recent samples (or levels) for display. The storage is
//! allocated once and never grows; writes overwrite the oldest slot.

use std::num::NonZeroUsize;

/// Circular buffer with a write cursor that wraps modulo capacity
#[derive(Clone, Debug)]
pub struct SampleRing<T> {
    slots: Box<[T]>,
    /// Index of the next slot to be overwritten
    cursor: usize,
}

impl<T: Copy + Default> SampleRing<T> {
    /// Create a ring with every slot set to `T::default()`
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: vec![T::default(); capacity.get()].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Overwrite the slot at the cursor and advance it by one
    pub fn push(&mut self, value: T) {
        self.slots[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    pub fn extend_from_slice(&mut self, values: &[T]) {
        for &value in values {
            self.push(value);
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Raw storage order, not time order
    #[cfg(test)]
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// The most recently written value
    pub fn latest(&self) -> T {
        let newest = (self.cursor + self.slots.len() - 1) % self.slots.len();
        self.slots[newest]
    }

    /// Iterate all `capacity` slots from oldest to newest.
    ///
    /// The oldest slot is the one under the cursor (it is the next to be
    /// overwritten), so iteration starts there and wraps around to the slot
    /// just behind it.
    pub fn oldest_first(&self) -> impl Iterator<Item = T> + '_ {
        let (newer, older) = self.slots.split_at(self.cursor);
        older.iter().chain(newer.iter()).copied()
    }
}
