//! Single-shot, task-notifying future.
//!
//! Carries `Ok(T) | Err(E) | Cancelled`, wakes exactly one waiting task
//! across threads, and never broadcasts — only one task may ever register
//! as the waiter. Grounded in the same publish-then-flag protocol the
//! teacher uses for its per-slot `stamp` (`fedemagnani-veloce::spsc::
//! slot::Slot`): a value becomes observable to the other side only after a
//! second atomic (`waiter_ready` here, `stamp` there) is released.

use crate::error::FutureError;
use crate::runtime::{SchedulerHandle, TaskContext, TaskId};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

const PENDING: u8 = 0;
const SETTING_RESULT: u8 = 1;
const READY: u8 = 2;
const CANCELLED: u8 = 3;

/// Everything [`Future::await_result`] can return besides the value itself.
#[derive(Debug)]
pub enum AwaitError<E> {
    /// The producer's own error, passed through from `set_err`.
    Err(E),
    /// The future was cancelled before a result was set.
    Cancelled,
    /// A second, distinct task attempted to await this future.
    AlreadyAwaited,
}

/// A single-shot cell carrying at most one of `Ok(T)`, `Err(E)` or
/// cancellation, readable by at most one registered waiter.
///
/// `H` is the host's [`SchedulerHandle`] type — the same one a
/// [`crate::channel::BlockingChannel<T, H>`] parked on this future's waiter
/// would use.
pub struct Future<T, E, H: SchedulerHandle> {
    state: AtomicU8,
    result: UnsafeCell<MaybeUninit<Result<T, E>>>,
    result_taken: AtomicBool,
    waiter_task_plus_one: AtomicU64,
    waiter_ready: AtomicBool,
    waiter_handle: UnsafeCell<MaybeUninit<H>>,
}

unsafe impl<T: Send, E: Send, H: SchedulerHandle> Send for Future<T, E, H> {}
unsafe impl<T: Send, E: Send, H: SchedulerHandle> Sync for Future<T, E, H> {}

impl<T, E, H: SchedulerHandle> Future<T, E, H> {
    /// A pending future with no registered waiter.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            result: UnsafeCell::new(MaybeUninit::uninit()),
            result_taken: AtomicBool::new(false),
            waiter_task_plus_one: AtomicU64::new(0),
            waiter_ready: AtomicBool::new(false),
            waiter_handle: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// A pending future with `ctx`'s task pre-registered as the waiter.
    pub fn new_notifying<C: TaskContext<Handle = H>>(ctx: &C) -> Self {
        let future = Self::new();
        future
            .install_waiter(ctx.task_id(), ctx.scheduler_handle())
            .expect("installing a waiter on a freshly-constructed future cannot fail");
        future
    }

    /// True iff the state is no longer `pending`.
    #[inline]
    pub fn done(&self) -> bool {
        self.state.load(Ordering::Acquire) != PENDING
    }

    /// True iff the state is `cancelled`.
    #[inline]
    pub fn cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    /// Sets the result to `Ok(value)`.
    pub fn set_ok(&self, value: T) -> Result<(), FutureError> {
        self.set_result(Ok(value))
    }

    /// Sets the result to `Err(error)`.
    pub fn set_err(&self, error: E) -> Result<(), FutureError> {
        self.set_result(Err(error))
    }

    fn set_result(&self, result: Result<T, E>) -> Result<(), FutureError> {
        match self
            .state
            .compare_exchange(PENDING, SETTING_RESULT, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                // Safety: we alone moved state out of `pending`; no other
                // writer can be touching this cell.
                unsafe { (*self.result.get()).write(result) };
                self.state.store(READY, Ordering::Release);
                self.notify_waiter();
                Ok(())
            }
            Err(CANCELLED) => Err(FutureError::Cancelled),
            Err(SETTING_RESULT) => {
                // A concurrent setter is mid-publish between the CAS and the
                // Release store below. We yield rather than busy-spin so a
                // single-threaded cooperative scheduler can make progress on
                // whichever task is still inside that setter.
                self.wait_while_setting();
                Err(FutureError::AlreadySet)
            }
            Err(_) => Err(FutureError::AlreadySet),
        }
    }

    /// Cancels the future. Fails if a result was already set, or if it was
    /// already cancelled.
    pub fn set_cancelled(&self) -> Result<(), FutureError> {
        match self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.notify_waiter();
                Ok(())
            }
            Err(CANCELLED) => Err(FutureError::AlreadyCancelled),
            Err(SETTING_RESULT) => {
                self.wait_while_setting();
                Err(FutureError::AlreadySet)
            }
            Err(_) => Err(FutureError::AlreadySet),
        }
    }

    fn wait_while_setting(&self) {
        while self.state.load(Ordering::Acquire) == SETTING_RESULT {
            std::thread::yield_now();
        }
    }

    /// Waits for a terminal state and returns the result, registering `ctx`
    /// as the waiter if the future is still pending.
    ///
    /// May be called at most once, by at most one task over the lifetime of
    /// the future: this is the single-shot, single-waiter contract. A
    /// second call from a different task fails with `AlreadyAwaited`; a
    /// second call from the *same* task after a result has already been
    /// consumed is not supported (the result cell is moved out on first
    /// read).
    pub fn await_result<C: TaskContext<Handle = H>>(&self, ctx: &C) -> Result<T, AwaitError<E>> {
        let my_task_id = ctx.task_id();
        loop {
            match self.state.load(Ordering::Acquire) {
                READY => {
                    // Safety: READY is sticky and set after the result was
                    // fully written under Release; we are the sole reader
                    // by contract.
                    let result = unsafe { (*self.result.get()).assume_init_read() };
                    self.result_taken.store(true, Ordering::Release);
                    return result.map_err(AwaitError::Err);
                }
                CANCELLED => return Err(AwaitError::Cancelled),
                SETTING_RESULT => {
                    self.wait_while_setting();
                }
                PENDING => match self.install_waiter(my_task_id, ctx.scheduler_handle()) {
                    Ok(()) => {
                        let state = self.state.load(Ordering::Acquire);
                        if state == PENDING || state == SETTING_RESULT {
                            ctx.scheduler_handle().trigger_await();
                        }
                    }
                    Err(()) => return Err(AwaitError::AlreadyAwaited),
                },
                _ => unreachable!("Future state is one of the four declared values"),
            }
        }
    }

    /// Installs `(task_id, handle)` as the waiter via compare-exchange from
    /// the "no waiter" sentinel (0). `Err(())` iff a *different* task is
    /// already registered — the caller turns that into `AlreadyAwaited`.
    fn install_waiter(&self, task_id: TaskId, handle: H) -> Result<(), ()> {
        let desired = task_id + 1;
        match self
            .waiter_task_plus_one
            .compare_exchange(0, desired, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => {
                // Safety: we alone won the install CAS, so no one else
                // writes this cell; `waiter_ready`'s release-store below
                // publishes the write to any reader that observes it.
                unsafe { (*self.waiter_handle.get()).write(handle) };
                self.waiter_ready.store(true, Ordering::Release);
                Ok(())
            }
            Err(existing) if existing == desired => Ok(()),
            Err(_) => Err(()),
        }
    }

    /// Triggers the registered waiter, if any. Spin-waits for
    /// `waiter_ready` if a waiter is mid-install — bounded, because install
    /// publishes the handle before it sets `waiter_ready`.
    fn notify_waiter(&self) {
        let task_plus_one = self.waiter_task_plus_one.load(Ordering::Acquire);
        if task_plus_one == 0 {
            return;
        }
        while !self.waiter_ready.load(Ordering::Acquire) {
            std::hint::spin_loop();
        }
        // Safety: waiter_ready == true means install_waiter finished its
        // write, synchronized by the Acquire load above.
        let handle = unsafe { (*self.waiter_handle.get()).assume_init_ref() };
        handle.trigger(task_plus_one - 1);
        handle.wake();
    }
}

impl<T, E, H: SchedulerHandle> Default for Future<T, E, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E, H: SchedulerHandle> Drop for Future<T, E, H> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY && !*self.result_taken.get_mut() {
            unsafe { (*self.result.get()).assume_init_drop() };
        }
        if *self.waiter_ready.get_mut() {
            unsafe { (*self.waiter_handle.get()).assume_init_drop() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::mock::MockScheduler;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn scheduler() -> MockScheduler {
        MockScheduler::new()
    }

    #[test]
    fn ok_round_trip_across_threads() {
        let sched = scheduler();
        let future: Arc<Future<u32, &'static str, MockScheduler>> = Arc::new(Future::new());

        let producer = {
            let future = future.clone();
            let sched = sched.clone();
            thread::spawn(move || {
                sched.attach(1);
                thread::sleep(Duration::from_millis(10));
                future.set_ok(42).unwrap();
            })
        };

        let ctx = sched.attach(2);
        let result = future.await_result(&ctx);
        producer.join().unwrap();

        assert!(matches!(result, Ok(42)));
        assert!(future.done());
        assert!(!future.cancelled());
    }

    #[test]
    fn cancellation_wakes_waiting_reader() {
        let sched = scheduler();
        let future: Arc<Future<u32, &'static str, MockScheduler>> = Arc::new(Future::new());

        let producer = {
            let future = future.clone();
            let sched = sched.clone();
            thread::spawn(move || {
                sched.attach(1);
                thread::sleep(Duration::from_millis(10));
                future.set_cancelled().unwrap();
            })
        };

        let ctx = sched.attach(2);
        let result = future.await_result(&ctx);
        producer.join().unwrap();

        assert!(matches!(result, Err(AwaitError::Cancelled)));
        assert_eq!(future.set_ok(1), Err(FutureError::Cancelled));
        assert_eq!(future.set_cancelled(), Err(FutureError::AlreadyCancelled));
    }

    /// Result set before any reader registers; three separate futures each
    /// observe it immediately without suspending.
    #[test]
    fn post_set_readers_see_result_without_parking() {
        let sched = scheduler();

        for task_id in 0..3u64 {
            let future: Future<u32, &'static str, MockScheduler> = Future::new();
            future.set_ok(999).unwrap();

            let ctx = sched.attach(task_id);
            assert!(matches!(future.await_result(&ctx), Ok(999)));
        }
    }

    #[test]
    fn set_ok_twice_fails_with_already_set() {
        let future: Future<u32, &'static str, MockScheduler> = Future::new();
        future.set_ok(1).unwrap();
        assert_eq!(future.set_ok(2), Err(FutureError::AlreadySet));
    }

    #[test]
    fn await_from_second_task_fails() {
        let sched = scheduler();
        let first = sched.attach(1);
        let second = sched.attach(2);

        let notifying: Future<u32, &'static str, MockScheduler> = Future::new_notifying(&first);
        let err = notifying.await_result(&second);
        assert!(matches!(err, Err(AwaitError::AlreadyAwaited)));

        notifying.set_ok(7).unwrap();
    }

    #[test]
    fn set_err_propagates_through_await() {
        let future: Future<u32, &'static str, MockScheduler> = Future::new();
        future.set_err("boom").unwrap();

        let sched = scheduler();
        let ctx = sched.attach(1);
        assert!(matches!(future.await_result(&ctx), Err(AwaitError::Err("boom"))));
    }

    #[test]
    fn drop_without_reader_drops_unread_result() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        struct DropCounter(Arc<std::sync::atomic::AtomicUsize>);
        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let future: Future<DropCounter, (), MockScheduler> = Future::new();
            future.set_ok(DropCounter(count.clone())).unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
