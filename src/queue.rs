//! Bounded FIFO queue of sample records
//!
//! Fixed capacity, chosen at construction. The full-queue policy is
//! **drop-newest**: `push` refuses the incoming sample and reports the drop
//! to the caller, which accounts for it in the device statistics. Overflow is
//! not an error: it is expected, silent data loss under sustained high-rate
//! sampling, observable only through counters.
//!
//! The queue is deliberately *not* internally synchronized. Every caller
//! holds the device guard, so compound push/pop sequences are observed
//! atomically by other threads.

use std::collections::VecDeque;

use crate::sample::Sample;

/// Default number of records the device buffers between producer and consumer
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Fixed-capacity FIFO of samples
#[derive(Debug)]
pub struct SampleQueue {
    slots: VecDeque<Sample>,
    capacity: usize,
}

impl SampleQueue {
    /// Create a queue with the given fixed capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "sample queue capacity must be > 0");
        SampleQueue {
            slots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample; returns `false` if the queue was full and the sample
    /// was dropped (drop-newest policy)
    pub fn push(&mut self, sample: Sample) -> bool {
        if self.slots.len() == self.capacity {
            return false;
        }
        self.slots.push_back(sample);
        true
    }

    /// Remove and return the oldest sample, if any
    pub fn pop(&mut self) -> Option<Sample> {
        self.slots.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
