//! Lock-free chunk queue between device callbacks and pipeline loops
//!
//! Single-producer single-consumer: the cpal callback pushes chunks, the
//! pipeline loop pops them (or the reverse for playback). Overflow and
//! underrun are counted, not fatal; under bursty load dropping a chunk is
//! the correct behavior for a live stream.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// SPSC queue of fixed-size sample chunks
pub struct ChunkQueue {
    queue: ArrayQueue<Vec<i16>>,
    overflow_count: AtomicUsize,
    underrun_count: AtomicUsize,
}

impl ChunkQueue {
    /// Create a queue with the specified capacity in chunks
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            overflow_count: AtomicUsize::new(0),
            underrun_count: AtomicUsize::new(0),
        }
    }

    /// Push a chunk; returns false (and counts an overflow) if full
    pub fn push(&self, chunk: Vec<i16>) -> bool {
        match self.queue.push(chunk) {
            Ok(()) => true,
            Err(_) => {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Pop a chunk; counts an underrun when empty
    pub fn pop(&self) -> Option<Vec<i16>> {
        match self.queue.pop() {
            Some(chunk) => Some(chunk),
            None => {
                self.underrun_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Pop without counting an underrun
    pub fn try_pop(&self) -> Option<Vec<i16>> {
        self.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    pub fn underrun_count(&self) -> usize {
        self.underrun_count.load(Ordering::Relaxed)
    }
}

/// Thread-safe handle to a chunk queue
pub type SharedChunkQueue = Arc<ChunkQueue>;

/// Create a new shared chunk queue
pub fn create_shared_queue(capacity: usize) -> SharedChunkQueue {
    Arc::new(ChunkQueue::new(capacity))
}
