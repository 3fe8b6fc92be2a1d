//! Shared error plumbing. Mirrors the teacher's `NetworkError` / `ErrorUtils` split: `Wait` means
//! "try again later, not a real failure" (typically a `WouldBlock`), everything else is fatal to
//! the socket or session it occurred on.

use std::fmt;
use std::io;

#[derive(Debug, Eq, PartialEq)]
pub enum NetworkError {
    /// Non-fatal: the operation would have blocked. Callers should stop looping, not tear
    /// anything down.
    Wait,
    Fatal(IoErrorKind),
}

/// A `Copy`-able, `Eq`-able stand-in for `std::io::ErrorKind` so `NetworkError` itself can derive
/// `Eq` without relying on `io::ErrorKind`'s own (stable) `Eq` impl tracking std exactly.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IoErrorKind(pub io::ErrorKind);

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Wait => write!(f, "operation would block"),
            NetworkError::Fatal(kind) => write!(f, "fatal network error: {:?}", kind.0),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<io::Error> for NetworkError {
    #[inline]
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => NetworkError::Wait,
            kind => NetworkError::Fatal(IoErrorKind(kind)),
        }
    }
}

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Extension trait distinguishing "didn't make progress this time" from "actually broken".
pub trait ErrorUtils {
    fn has_failed(&self) -> bool;
}

impl<T> ErrorUtils for NetworkResult<T> {
    #[inline]
    fn has_failed(&self) -> bool {
        !matches!(self, Ok(_) | Err(NetworkError::Wait))
    }
}
