//! Async-aware blocking channel built on two [`crate::ring::Ring`]s of
//! parked waiters.
//!
//! The teacher's `Sender`/`Receiver` pair register a single `AtomicWaker`
//! each, since a SPSC channel only ever has one producer and one consumer
//! to wake (`fedemagnani-veloce::spsc::channel::Wakers`). A channel open to
//! many producers and many consumers can have many tasks parked on the same
//! side at once, so waiters here are explicit `Waiter<H>` records — each
//! carrying the parked task's id and scheduler handle — held in their own
//! rings (`pending_pushes`, `pending_pops`) rather than a single slot.
//!
//! The register-then-double-check-then-maybe-self-wake sequence in
//! [`BlockingChannel::push`]/[`BlockingChannel::pop`] is the same shape as
//! the teacher's `SendFuture`/`RecvFuture` poll bodies, which register a
//! waker and recheck the ring before returning `Poll::Pending` to avoid a
//! wakeup missed between the first failed attempt and the registration.

use crate::error::{Empty, Full, PopError, PushError};
use crate::ring::Ring;
use crate::runtime::{SchedulerHandle, TaskContext, TaskId};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Waiter<H> {
    task_id: TaskId,
    handle: H,
}

struct ChannelInner<T, H> {
    items: Ring<T>,
    pending_pops: Ring<Waiter<H>>,
    pending_pushes: Ring<Waiter<H>>,
    running: CachePadded<AtomicBool>,
}

/// A bounded MPMC channel whose blocking `push`/`pop` park the calling task
/// on a host scheduler instead of the OS thread.
///
/// Cheap to clone — clones share the same underlying rings, the same way
/// `Arc<ChannelInner<..>>` is meant to be shared across producer and
/// consumer tasks.
pub struct BlockingChannel<T, H: SchedulerHandle> {
    inner: Arc<ChannelInner<T, H>>,
}

impl<T, H: SchedulerHandle> Clone for BlockingChannel<T, H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

unsafe impl<T: Send, H: SchedulerHandle> Send for BlockingChannel<T, H> {}
unsafe impl<T: Send, H: SchedulerHandle> Sync for BlockingChannel<T, H> {}

impl<T, H: SchedulerHandle> BlockingChannel<T, H> {
    /// `item_capacity` bounds how many items may be buffered;
    /// `waiter_capacity` bounds how many tasks may be parked on one side at
    /// once (a push or pop beyond that limit fails fast with
    /// [`PushError::NotifyCapacity`] / [`PopError::NotifyCapacity`] rather
    /// than parking). Both are rounded up to the next power of two by
    /// [`Ring::new`].
    pub fn new(item_capacity: usize, waiter_capacity: usize) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                items: Ring::new(item_capacity),
                pending_pops: Ring::new(waiter_capacity),
                pending_pushes: Ring::new(waiter_capacity),
                running: CachePadded::new(AtomicBool::new(true)),
            }),
        }
    }

    #[inline]
    fn running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Releases one parked waiter from `waiters`, if any, so it can recheck
    /// its condition. Does not guarantee FIFO order across the whole
    /// channel's lifetime, only that waiters are drained oldest-registered
    /// first within `waiters` itself (the ring is a FIFO).
    fn release_one(waiters: &Ring<Waiter<H>>) {
        if let Ok(waiter) = waiters.pop() {
            waiter.handle.trigger(waiter.task_id);
            waiter.handle.wake();
        }
    }

    /// Publishes `value` without parking. Fails with [`Full`] (handing
    /// `value` back) if the item ring has no room.
    pub fn push_nowait(&self, value: T) -> Result<(), Full<T>> {
        self.inner.items.push(value)?;
        Self::release_one(&self.inner.pending_pops);
        Ok(())
    }

    /// Consumes the oldest item without parking. Fails with [`Empty`] if
    /// none is buffered.
    pub fn pop_nowait(&self) -> Result<T, Empty> {
        let value = self.inner.items.pop()?;
        Self::release_one(&self.inner.pending_pushes);
        Ok(value)
    }

    /// Publishes `value`, parking the calling task via `ctx` while the item
    /// ring is full. Returns once the value is enqueued, the channel is
    /// shut down, or the pending-push ring itself has no room left to park
    /// in.
    pub fn push<C: TaskContext<Handle = H>>(&self, ctx: &C, mut value: T) -> Result<(), PushError<T>> {
        loop {
            value = match self.push_nowait(value) {
                Ok(()) => return Ok(()),
                Err(Full(v)) => v,
            };

            if !self.running() {
                return Err(PushError::ShutdownWhileFull(value));
            }

            let waiter = Waiter {
                task_id: ctx.task_id(),
                handle: ctx.scheduler_handle(),
            };
            match self.inner.pending_pushes.push(waiter) {
                Ok(()) => {
                    // Double-check: a slot may have opened, or a shutdown
                    // may have landed, between our failed push above and
                    // this registration. If so, wake ourselves immediately
                    // rather than parking on a wakeup that already fired.
                    if !self.running() || !self.inner.items.is_full() {
                        ctx.scheduler_handle().trigger(ctx.task_id());
                    }
                    ctx.scheduler_handle().trigger_await();
                }
                Err(Full(_)) => return Err(PushError::NotifyCapacity(value)),
            }
        }
    }

    /// Consumes the oldest item, parking the calling task via `ctx` while
    /// the item ring is empty. Returns once an item is available, the
    /// channel is shut down with nothing left to drain, or the
    /// pending-pop ring itself has no room left to park in.
    pub fn pop<C: TaskContext<Handle = H>>(&self, ctx: &C) -> Result<T, PopError> {
        loop {
            match self.pop_nowait() {
                Ok(value) => return Ok(value),
                Err(Empty) => {}
            }

            if !self.running() {
                return Err(PopError::Shutdown);
            }

            let waiter = Waiter {
                task_id: ctx.task_id(),
                handle: ctx.scheduler_handle(),
            };
            match self.inner.pending_pops.push(waiter) {
                Ok(()) => {
                    if !self.running() || !self.inner.items.is_empty() {
                        ctx.scheduler_handle().trigger(ctx.task_id());
                    }
                    ctx.scheduler_handle().trigger_await();
                }
                Err(Full(_)) => return Err(PopError::NotifyCapacity),
            }
        }
    }

    /// Drains every item currently buffered without parking, appending them
    /// to `out` in FIFO order. Returns the number drained. Grounded in the
    /// teacher's `Drain` iterator (`fedemagnani-veloce::spsc::receiver`),
    /// which batches a run of pops into a single pass rather than one
    /// acquire/release per item — here expressed as draining eagerly into
    /// a caller-owned buffer instead of a lazy iterator, since an MPMC ring
    /// offers no contiguous-slice fast path to iterate over.
    pub fn drain_nowait(&self, out: &mut Vec<T>) -> usize {
        let mut drained = 0;
        while let Ok(value) = self.inner.items.pop() {
            out.push(value);
            drained += 1;
        }
        for _ in 0..drained {
            Self::release_one(&self.inner.pending_pushes);
        }
        drained
    }

    /// Advisory count of items currently buffered.
    pub fn approx_len(&self) -> usize {
        self.inner.items.approx_len()
    }

    /// Marks the channel shut down and wakes every currently parked waiter
    /// on both sides so they observe the shutdown and return
    /// [`PushError::ShutdownWhileFull`] / [`PopError::Shutdown`] (unless
    /// they find an item or slot to act on first). Idempotent.
    ///
    /// A `push`/`pop` that reads `running() == true` just before the store
    /// below can still register its [`Waiter`] into one of the pending
    /// rings after a single drain pass has already seen that ring empty,
    /// which would leave it parked forever. So this keeps re-scanning both
    /// rings — yielding between passes to give such a registration time to
    /// land — until two consecutive passes drain nothing, not just one.
    pub fn shutdown(&self) {
        self.inner.running.store(false, Ordering::SeqCst);

        let mut quiet_passes = 0;
        while quiet_passes < 2 {
            let mut released = false;
            while let Ok(waiter) = self.inner.pending_pops.pop() {
                waiter.handle.trigger(waiter.task_id);
                waiter.handle.wake();
                released = true;
            }
            while let Ok(waiter) = self.inner.pending_pushes.pop() {
                waiter.handle.trigger(waiter.task_id);
                waiter.handle.wake();
                released = true;
            }
            if released {
                quiet_passes = 0;
            } else {
                quiet_passes += 1;
                std::thread::yield_now();
            }
        }
    }
}
