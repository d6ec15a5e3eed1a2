//! Lock-Free Sample Queue Between the Trigger and Polled Contexts
#![allow(unsafe_code)] // Required for lock-free atomic operations
//!
//! ## Overview
//!
//! This module implements the bounded, lock-free Single Producer Single
//! Consumer (SPSC) queue that carries raw sample pairs from the trigger
//! context (the [`Sampler`](crate::sampler::Sampler)) to the polled context
//! (the [`Estimator`](crate::estimator::Estimator)). It is the only piece
//! of state shared between the two sides of the system.
//!
//! ## Why Lock-Free?
//!
//! The producer runs inside an interrupt handler. A mutex-based queue
//! would mean:
//!
//! 1. **Priority Inversion**: the mainline holding the lock blocks the ISR
//! 2. **Unpredictable Latency**: contention causes variable trigger jitter
//! 3. **Deadlock Risk**: a lock taken with interrupts disabled can freeze
//!    the system
//!
//! With atomic head/tail indices neither side ever waits:
//! ```text
//! Producer (trigger ISR)              Consumer (polled drain)
//!      ↓                                      ↓
//!   Atomic Write ────→ Ring Buffer ←──── Atomic Read
//!      ↓                                      ↓
//!   Never Blocks                         Never Blocks
//! ```
//!
//! ## Algorithm
//!
//! A ring buffer with atomic head (next write) and tail (next read):
//!
//! ### Push (producer only)
//! 1. Load head, compute the next position (capacity is a power of two,
//!    so wrap is a mask)
//! 2. If the next position equals tail the queue is full: count the drop
//!    and return without writing. The pair is discarded, the producer
//!    never waits for space.
//! 3. Write the pair into the slot, then publish with a Release store of
//!    head
//!
//! ### Pop (consumer only)
//! 1. Load tail; if it equals head the queue is empty, return `None`
//! 2. Read the slot, then publish with a Release store of tail
//!
//! With exactly one producer and one consumer, each index has a single
//! writer, so plain load/store atomics suffice. There is no CAS loop and
//! no retry: both operations are a constant, short instruction sequence,
//! which keeps the trigger handler inside its timing budget. The consumer's
//! removal transfers one element between two atomic operations and cannot
//! be torn by the producer, which only ever touches the other index.
//!
//! ## Memory Ordering
//!
//! - **Acquire** on the opposing index: observe the other side's slot
//!   accesses before trusting the index
//! - **Release** on the own index: make the slot access visible before
//!   publishing it
//! - **Relaxed** for statistics, which do not affect correctness
//!
//! ## Drop-On-Full
//!
//! Overrun discards the *new* pair. Recent history matters less than a
//! deterministic producer: the estimator re-synchronizes on the next zero
//! crossing, while a blocked trigger handler would corrupt the sampling
//! period for every later sample. Drops are visible in
//! [`QueueStats::dropped`].

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// One raw conversion result per channel, produced per trigger period.
///
/// Codes are uncentered converter output; the estimator removes the DC
/// offset. Pairs are immutable once produced and live only inside the
/// queue between production and consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawSamplePair {
    /// Raw code from the voltage channel
    pub voltage: u16,
    /// Raw code from the current channel
    pub current: u16,
}

/// Lock-free SPSC queue of sample pairs
///
/// `N` must be a power of two; one slot is sacrificed to distinguish full
/// from empty, so the queue holds up to `N - 1` pairs. Size it so the
/// producer cannot fill it between two host polls.
///
/// ## Example
///
/// ```rust
/// use powermon_core::queue::{RawSamplePair, SampleQueue};
///
/// static QUEUE: SampleQueue<64> = SampleQueue::new();
///
/// // Producer (trigger handler)
/// QUEUE.push(RawSamplePair { voltage: 512, current: 508 });
///
/// // Consumer (polled drain)
/// while let Some(pair) = QUEUE.pop() {
///     let _ = pair;
/// }
/// ```
pub struct SampleQueue<const N: usize> {
    /// Ring buffer storage
    ///
    /// UnsafeCell for interior mutability; the atomics below fence every
    /// access. Pairs are plain Copy data, so slots need no initialization
    /// tracking.
    buffer: UnsafeCell<[RawSamplePair; N]>,

    /// Next write position (producer owned)
    head: AtomicUsize,

    /// Next read position (consumer owned)
    tail: AtomicUsize,

    /// Queue statistics
    stats: QueueStats,
}

/// Queue health counters
///
/// Updated with Relaxed ordering; cheap enough to keep in every build.
pub struct QueueStats {
    /// Total pairs pushed
    pub pushed: AtomicU32,
    /// Total pairs popped
    pub popped: AtomicU32,
    /// Pairs discarded because the queue was full
    pub dropped: AtomicU32,
    /// High-water mark of queue occupancy
    pub max_depth: AtomicU32,
}

impl QueueStats {
    const fn new() -> Self {
        Self {
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_depth: AtomicU32::new(0),
        }
    }

    /// Update max depth if current is higher
    fn update_max_depth(&self, current: u32) {
        let mut max = self.max_depth.load(Ordering::Relaxed);
        while current > max {
            match self.max_depth.compare_exchange_weak(
                max,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }
}

impl<const N: usize> SampleQueue<N> {
    /// Create a new empty queue
    ///
    /// Usable in `static` context, which is where instances normally live
    /// so both execution contexts can reach them.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two() && N > 1, "capacity must be a power of two");
        Self {
            buffer: UnsafeCell::new([RawSamplePair { voltage: 0, current: 0 }; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            stats: QueueStats::new(),
        }
    }

    /// Push a pair (single producer)
    ///
    /// Returns `false` if the queue is full; the pair is discarded and
    /// [`QueueStats::dropped`] incremented. Never blocks.
    ///
    /// Must only be called from the one producer context.
    pub fn push(&self, pair: RawSamplePair) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next_head = (head + 1) & (N - 1); // Fast modulo for power of 2

        if next_head == self.tail.load(Ordering::Acquire) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // Sole producer: no other writer can touch this slot
        unsafe {
            (*self.buffer.get())[head] = pair;
        }

        // Make the slot write visible before publishing the new head
        self.head.store(next_head, Ordering::Release);

        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.stats.update_max_depth(self.len() as u32);

        true
    }

    /// Pop a pair (single consumer)
    ///
    /// Returns `None` when the queue is empty, so the drain loop is
    /// simply `while let Some(pair) = queue.pop()`.
    ///
    /// Must only be called from the one consumer context.
    pub fn pop(&self) -> Option<RawSamplePair> {
        let tail = self.tail.load(Ordering::Relaxed);

        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        // Sole consumer: the producer cannot reuse this slot until the
        // tail store below publishes it as free
        let pair = unsafe { (*self.buffer.get())[tail] };

        self.tail.store((tail + 1) & (N - 1), Ordering::Release);
        self.stats.popped.fetch_add(1, Ordering::Relaxed);

        Some(pair)
    }

    /// Current occupancy
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);

        if head >= tail {
            head - tail
        } else {
            N - tail + head
        }
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Check if queue is full
    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        ((head + 1) & (N - 1)) == tail
    }

    /// Get queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Drain all pairs from the consumer side
    pub fn drain(&self) -> QueueDrain<'_, N> {
        QueueDrain { queue: self }
    }
}

// The queue synchronizes its one producer and one consumer internally
unsafe impl<const N: usize> Send for SampleQueue<N> {}
unsafe impl<const N: usize> Sync for SampleQueue<N> {}

/// Iterator popping pairs until the queue is empty
pub struct QueueDrain<'a, const N: usize> {
    queue: &'a SampleQueue<N>,
}

impl<'a, const N: usize> Iterator for QueueDrain<'a, N> {
    type Item = RawSamplePair;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop()
    }
}
