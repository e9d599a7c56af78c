//! Bounded, lock-free, multi-producer/multi-consumer ring buffer.
//!
//! Vyukov-style: each cell carries its own `sequence` counter and arbitrates
//! producer/consumer access without taking a cell-specific lock. Grounded in
//! the teacher's `Slot<T>` stamp protocol (`fedemagnani-veloce::spsc::slot`),
//! generalized from single-producer/single-consumer (no CAS needed — there
//! is only ever one writer) to multi-producer/multi-consumer (the `write_index`
//! and `read_index` cursors are claimed via `compare_exchange_weak` instead of
//! being owned outright by one thread).

use crate::error::{Empty, Full};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Cell<T> {
    /// Writable iff `sequence == position`; readable iff
    /// `sequence == position + 1`. After a write of position `p`,
    /// becomes `p + 1`. After a read of position `p`, becomes `p + capacity`.
    sequence: AtomicUsize,
    data: UnsafeCell<MaybeUninit<T>>,
}

/// A fixed-capacity, lock-free MPMC FIFO queue.
///
/// `Full` and `Empty` are advisory outcomes, not failures — match on them
/// rather than propagating with `?`.
pub struct Ring<T> {
    mask: usize,
    buffer: Box<[Cell<T>]>,
    write_index: CachePadded<AtomicUsize>,
    read_index: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Rounds `min_capacity` up to the next power of two `>= 2`.
    pub fn new(min_capacity: usize) -> Self {
        let capacity = min_capacity.max(2).next_power_of_two();
        let buffer = (0..capacity)
            .map(|i| Cell {
                sequence: AtomicUsize::new(i),
                data: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            mask: capacity - 1,
            buffer,
            write_index: CachePadded::new(AtomicUsize::new(0)),
            read_index: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Fixed capacity chosen at construction (power of two).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Advisory count of items currently enqueued. Wrapping subtraction of
    /// the two cursors; may be stale the instant it is observed under
    /// concurrent use.
    #[inline]
    pub fn approx_len(&self) -> usize {
        let w = self.write_index.load(Ordering::Relaxed);
        let r = self.read_index.load(Ordering::Relaxed);
        w.wrapping_sub(r)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.approx_len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.approx_len() >= self.capacity()
    }

    /// Attempts to publish `value`. Returns [`Full`] (with `value` handed
    /// back) when no writable cell is available, leaving the ring unchanged.
    pub fn push(&self, value: T) -> Result<(), Full<T>> {
        let mut pos = self.write_index.load(Ordering::Relaxed);
        loop {
            let cell = &self.buffer[pos & self.mask];
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;

            if diff == 0 {
                match self.write_index.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: we alone claimed this cell at this sequence;
                        // no other producer or consumer touches it until we
                        // publish the release-store below.
                        unsafe { (*cell.data.get()).write(value) };
                        cell.sequence.store(pos + 1, Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return Err(Full(value));
            } else {
                pos = self.write_index.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempts to consume the oldest value. Returns [`Empty`] when none is
    /// available, leaving the ring unchanged.
    pub fn pop(&self) -> Result<T, Empty> {
        let mut pos = self.read_index.load(Ordering::Relaxed);
        loop {
            let cell = &self.buffer[pos & self.mask];
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq as isize - (pos as isize + 1);

            if diff == 0 {
                match self.read_index.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: sequence == pos + 1 means a producer
                        // published a fully-initialized value here, and we
                        // alone claimed the read of position `pos`.
                        let value = unsafe { (*cell.data.get()).assume_init_read() };
                        cell.sequence.store(pos + self.capacity(), Ordering::Release);
                        return Ok(value);
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return Err(Empty);
            } else {
                pos = self.read_index.load(Ordering::Relaxed);
            }
        }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Exclusive access: drop every cell still holding an unread value.
        // A cell at position `p` (read_index <= p < write_index) is readable
        // iff its sequence equals p + 1, exactly the condition `pop` checks.
        let read = *self.read_index.get_mut();
        let write = *self.write_index.get_mut();
        let mut pos = read;
        while pos != write {
            let cell = &self.buffer[pos & self.mask];
            let seq = *cell.sequence.get_mut();
            if seq == pos + 1 {
                unsafe { (*cell.data.get()).assume_init_drop() };
            }
            pos += 1;
        }
    }
}
