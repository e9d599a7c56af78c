//! The runtime contract this crate consumes.
//!
//! Nothing in this module is an executor. It is the trait boundary a host
//! cooperative-task runtime must satisfy for [`crate::channel::BlockingChannel`]
//! and [`crate::future::Future`] to park and resume tasks across threads.
//! The core never implements these traits itself — it never owns its own
//! executor.

/// Opaque task identifier, unique within a scheduler while the task is live.
pub type TaskId = u64;

/// A handle to the scheduler that owns a task, usable from any thread.
///
/// Implementations are expected to be cheap to clone (an `Arc`-backed handle,
/// a raw pointer into a pinned executor, or similar) since one is stored per
/// parked waiter.
pub trait SchedulerHandle: Clone + Send + Sync + 'static {
    /// Mark `task_id` runnable on this scheduler. Idempotent, safe from any
    /// thread, including threads that do not own this scheduler.
    fn trigger(&self, task_id: TaskId);

    /// Suspend the calling task until it is triggered. Only ever called by
    /// the task that owns this scheduler, from inside that scheduler's own
    /// execution — never from a releasing side.
    fn trigger_await(&self);

    /// Nudge the scheduler's event loop if it is idle waiting on I/O. Safe
    /// from any thread.
    fn wake(&self);
}

/// The calling task's identity and scheduler, as seen by the core.
///
/// A host runtime passes one of these into every blocking call
/// (`BlockingChannel::push`/`pop`, `Future::await_result`) so the core can
/// construct a [`crate::channel::Waiter`] or register itself as a future's
/// waiter without ever referring to executor internals.
pub trait TaskContext {
    /// The concrete scheduler handle type this runtime hands out.
    type Handle: SchedulerHandle;

    /// The identifier of the task currently executing this call.
    fn task_id(&self) -> TaskId;

    /// A handle to the scheduler that owns the current task.
    fn scheduler_handle(&self) -> Self::Handle;
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    //! A minimal [`SchedulerHandle`]/[`TaskContext`] pair backed by
    //! `std::thread::park`/`unpark`, used by this crate's own tests and
    //! benches. Not a product feature: no external runtime dependency is
    //! pulled in to provide it, matching the teacher's own tests, which
    //! stand up nothing heavier than `std::thread` to exercise cross-thread
    //! paths.

    use super::{SchedulerHandle, TaskContext, TaskId};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::thread::Thread;

    #[derive(Clone, Default)]
    pub struct MockScheduler {
        threads: Arc<Mutex<HashMap<TaskId, Thread>>>,
    }

    impl MockScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers the calling OS thread as the owner of `task_id` and
        /// returns a [`MockTaskContext`] for it. Each "task" in this mock is
        /// one OS thread, since there is no cooperative scheduler here to
        /// multiplex several tasks onto one thread.
        pub fn attach(&self, task_id: TaskId) -> MockTaskContext {
            self.threads
                .lock()
                .unwrap()
                .insert(task_id, std::thread::current());
            MockTaskContext {
                task_id,
                scheduler: self.clone(),
            }
        }
    }

    impl SchedulerHandle for MockScheduler {
        fn trigger(&self, task_id: TaskId) {
            if let Some(thread) = self.threads.lock().unwrap().get(&task_id) {
                thread.unpark();
            }
        }

        fn trigger_await(&self) {
            std::thread::park();
        }

        fn wake(&self) {}
    }

    #[derive(Clone)]
    pub struct MockTaskContext {
        task_id: TaskId,
        scheduler: MockScheduler,
    }

    impl TaskContext for MockTaskContext {
        type Handle = MockScheduler;

        fn task_id(&self) -> TaskId {
            self.task_id
        }

        fn scheduler_handle(&self) -> Self::Handle {
            self.scheduler.clone()
        }
    }
}
