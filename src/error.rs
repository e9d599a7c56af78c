//! Error types shared by [`crate::ring`], [`crate::channel`] and [`crate::future`].
//!
//! `Full`/`Empty` (and their channel-level cousins) are advisory outcomes,
//! not failures in the operational sense — callers are expected to match on
//! them rather than propagate with `?` in the hot path. They carry the
//! rejected value back to the caller, idiomatic for a Rust channel and a
//! mirror of `std::sync::mpsc::SendError<T>`.

use std::fmt;
use thiserror::Error;

/// No readable cell was available. Carries no data: nothing was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ring is empty")]
pub struct Empty;

/// No writable cell was available; `value` was never enqueued and is
/// handed back so the caller can retry or drop it explicitly.
pub struct Full<T>(pub T);

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Full").field(&"..").finish()
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ring is full")
    }
}

impl<T> std::error::Error for Full<T> {}

/// Blocking-push outcome for [`crate::channel::BlockingChannel`] other than
/// success: the value is handed back in both cases.
pub enum PushError<T> {
    /// The channel was shut down while this push was parked on a full ring
    /// (or observed shut down before it could park at all).
    ShutdownWhileFull(T),
    /// The pending-push ring is itself full; the caller cannot park.
    NotifyCapacity(T),
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShutdownWhileFull(_) => f.debug_tuple("ShutdownWhileFull").field(&"..").finish(),
            Self::NotifyCapacity(_) => f.debug_tuple("NotifyCapacity").field(&"..").finish(),
        }
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShutdownWhileFull(_) => {
                f.write_str("channel was shut down while push was blocked on a full ring")
            }
            Self::NotifyCapacity(_) => {
                f.write_str("pending-waiter ring is full, cannot park (size the channel larger)")
            }
        }
    }
}

impl<T> std::error::Error for PushError<T> {}

/// Blocking-pop outcome for [`crate::channel::BlockingChannel`] other than
/// success. Nothing was consumed, so there is no value to hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PopError {
    /// `pop` observed (or raced with) `shutdown` on an empty channel.
    #[error("channel was shut down")]
    Shutdown,
    /// The pending-pop ring is itself full; the caller cannot park.
    #[error("pending-waiter ring is full, cannot park (size the channel larger)")]
    NotifyCapacity,
}

/// Outcome of a [`crate::future::Future`] operation other than success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FutureError {
    /// The future was cancelled; surfaced both to readers and to producers
    /// that race a `set_ok`/`set_err` against a `set_cancelled`.
    #[error("future was cancelled")]
    Cancelled,
    /// A producer call lost the race to set the result.
    #[error("future result was already set")]
    AlreadySet,
    /// `set_cancelled` was called on a future that is already cancelled.
    #[error("future was already cancelled")]
    AlreadyCancelled,
    /// A second, distinct task attempted to register as the waiter.
    #[error("future already has a registered waiter")]
    AlreadyAwaited,
}
