//! Bounded Ring Buffer for Sliding-Window History
//!
//! ## Overview
//!
//! Every history SourceFusion keeps is a sliding window: quality scores per
//! provider, health-check samples per provider, alerts, weight snapshots and
//! weight adjustments. None of them may grow without bound, and in all of
//! them recent data is more valuable than old data.
//!
//! `RingBuffer` keeps the most recent `capacity` items and silently overwrites
//! the oldest one when full, so a long-running process holds a constant amount
//! of history no matter how long it runs.
//!
//! ## Design Rationale
//!
//! ### Runtime Capacity
//!
//! Window sizes are configuration (288 health samples, 1000 alerts, 100
//! quality scores) rather than compile-time constants, so capacity is a
//! constructor argument. Storage grows lazily up to `capacity` and is then
//! reused in place.
//!
//! ### Memory Layout
//!
//! ```text
//! RingBuffer (capacity 5) after 7 pushes:
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  F  │  G  │  C  │  D  │  E  │  ← storage
//! └─────┴─────┴─────┴─────┴─────┘
//!             ↑
//!             └── write_pos = 2 (oldest item, next to be overwritten)
//!
//! Logical view (oldest → newest): C, D, E, F, G
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use sourcefusion_core::buffer::RingBuffer;
//!
//! let mut latencies = RingBuffer::new(3);
//! for ms in [120.0, 80.0, 95.0, 400.0] {
//!     latencies.push(ms);
//! }
//!
//! // Oldest sample (120) was evicted
//! let window: Vec<f64> = latencies.iter().copied().collect();
//! assert_eq!(window, vec![80.0, 95.0, 400.0]);
//! assert_eq!(latencies.last(), Some(&400.0));
//! ```

/// Bounded FIFO that overwrites its oldest entry when full
///
/// ## Internal Invariants
///
/// - `data.len() <= capacity`
/// - while not full, `write_pos == data.len() % capacity`
/// - once full, `write_pos` indexes the oldest element
///
/// ## Thread Safety
///
/// Not thread-safe on its own. Owners wrap it in a lock together with the
/// rest of the state it belongs to.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Backing storage, grows until it reaches `capacity`
    data: Vec<T>,

    /// Maximum number of retained items (always >= 1)
    capacity: usize,

    /// Index where the next overwrite happens once full
    write_pos: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` items
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity.min(1024)),
            capacity,
            write_pos: 0,
        }
    }

    /// Adds an item, returning the evicted oldest item when full
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.data.len() < self.capacity {
            self.data.push(item);
            self.write_pos = self.data.len() % self.capacity;
            None
        } else {
            let evicted = std::mem::replace(&mut self.data[self.write_pos], item);
            self.write_pos = (self.write_pos + 1) % self.capacity;
            Some(evicted)
        }
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Maximum number of retained items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent item
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        // Most recent is one before write position
        let idx = if self.write_pos == 0 {
            self.data.len() - 1
        } else {
            self.write_pos - 1
        };

        self.data.get(idx)
    }

    /// Gets an item by logical index (0 = oldest, len-1 = newest)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.data.len() {
            return None;
        }

        let actual_index = if self.data.len() < self.capacity {
            index
        } else {
            (self.write_pos + index) % self.capacity
        };

        self.data.get(actual_index)
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> RingIter<'_, T> {
        RingIter {
            buffer: self,
            front: 0,
            back: self.data.len(),
        }
    }

    /// Iterate over the newest `n` items, oldest of them first
    pub fn recent(&self, n: usize) -> RingIter<'_, T> {
        let len = self.data.len();
        RingIter {
            buffer: self,
            front: len.saturating_sub(n),
            back: len,
        }
    }

    /// Drop all items, keeping the capacity
    pub fn clear(&mut self) {
        self.data.clear();
        self.write_pos = 0;
    }

    /// Mutable access to some item matching `pred`
    ///
    /// Search order is storage order, not age order.
    pub fn find_mut<F: FnMut(&T) -> bool>(&mut self, mut pred: F) -> Option<&mut T> {
        self.data.iter_mut().find(|item| pred(item))
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy the contents out, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

/// Iterator over ring buffer contents in chronological order
pub struct RingIter<'a, T> {
    buffer: &'a RingBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for RingIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.buffer.get(self.front)?;
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back.saturating_sub(self.front);
        (remaining, Some(remaining))
    }
}

impl<'a, T> DoubleEndedIterator for RingIter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.buffer.get(self.back)
    }
}

impl<'a, T> ExactSizeIterator for RingIter<'a, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer() {
        let buffer: RingBuffer<u32> = RingBuffer::new(5);
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert!(buffer.last().is_none());
        assert_eq!(buffer.iter().count(), 0);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut buffer = RingBuffer::new(0);
        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.to_vec(), vec![2]);
    }

    #[test]
    fn push_and_retrieve() {
        let mut buffer = RingBuffer::new(5);
        assert_eq!(buffer.push(25), None);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.last(), Some(&25));
    }

    #[test]
    fn circular_overwrite() {
        let mut buffer = RingBuffer::new(3);

        let mut evicted = Vec::new();
        for i in 0..5 {
            if let Some(old) = buffer.push(i) {
                evicted.push(old);
            }
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.len(), buffer.capacity());
        assert_eq!(buffer.to_vec(), vec![2, 3, 4]);
        assert_eq!(evicted, vec![0, 1]);
        assert_eq!(buffer.last(), Some(&4));
    }

    #[test]
    fn recent_window() {
        let mut buffer = RingBuffer::new(4);
        for i in 0..6 {
            buffer.push(i);
        }

        let last_two: Vec<i32> = buffer.recent(2).copied().collect();
        assert_eq!(last_two, vec![4, 5]);

        let more_than_len: Vec<i32> = buffer.recent(10).copied().collect();
        assert_eq!(more_than_len, vec![2, 3, 4, 5]);
    }

    #[test]
    fn reverse_iteration() {
        let mut buffer = RingBuffer::new(3);
        for i in 0..4 {
            buffer.push(i);
        }
        let newest_first: Vec<i32> = buffer.iter().rev().copied().collect();
        assert_eq!(newest_first, vec![3, 2, 1]);
    }
}
