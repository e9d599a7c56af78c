//! Lock-free MPMC ring, async-aware blocking channel, and a single-shot
//! notifying future — concurrency primitives for a cooperative-task runtime
//! that owns its own executor and simply needs these to park and resume
//! tasks across threads.
//!
//! This crate never spawns a task, never polls anything, and never logs:
//! the host runtime is the only thing that knows how to suspend and resume
//! its own tasks, reached exclusively through the [`runtime`] module's
//! traits.
//!
//! Grounded in `fedemagnani-veloce`'s SPSC ring/channel/slot design,
//! generalized to multi-producer/multi-consumer and re-pointed at a
//! trait-based scheduler contract instead of `std::future::Future`.

pub mod channel;
pub mod error;
pub mod future;
pub mod ring;
pub mod runtime;

pub use channel::BlockingChannel;
pub use error::{Empty, Full, FutureError, PopError, PushError};
pub use future::{AwaitError, Future};
pub use ring::Ring;
pub use runtime::{SchedulerHandle, TaskContext, TaskId};
