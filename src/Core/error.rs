use std::fmt;
use thiserror::Error;

/// Errors reported by channel construction and channel operations.
///
/// `Timeout`, `WouldBlock` and `Contended` are ordinary outcomes of the
/// timed and non-blocking operations, not failures of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Storage for the requested number of slots could not be reserved.
    #[error("failed to allocate storage for {slots} slots")]
    Allocation { slots: usize },
    /// The channel was used in a way its construction does not allow.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    /// The deadline elapsed before the channel became ready.
    #[error("operation timed out")]
    Timeout,
    /// The channel was full (put) or empty (take).
    #[error("operation would block")]
    WouldBlock,
    /// The channel lock was held by another thread.
    #[error("channel lock is contended")]
    Contended,
}

impl Error {
    /// True for the outcomes a caller is expected to retry or ignore.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Timeout | Error::WouldBlock | Error::Contended)
    }
}

/// A put that did not happen. Carries the element back to the caller.
#[derive(Error)]
#[error("{kind}")]
pub struct Rejected<T> {
    kind: Error,
    value: T,
}

impl<T> Rejected<T> {
    pub(crate) fn new(kind: Error, value: T) -> Self {
        Self { kind, value }
    }

    /// Why the put failed.
    pub fn kind(&self) -> Error {
        self.kind
    }

    /// Recover the element that was not stored.
    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Rejected<U> {
        Rejected {
            kind: self.kind,
            value: f(self.value),
        }
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<T> From<Rejected<T>> for Error {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.kind
    }
}
