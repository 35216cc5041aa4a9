//! Errors surfaced by the transactional clause store.
//!
//! Mirrors the donor crate's hand-rolled `Error`/`CResult` pair rather than
//! reaching for a derive-macro error crate: there is no dependency tree here
//! that would make `thiserror` pull its weight, and every call site already
//! threads `CResult` through with `?`.

use std::fmt;

/// Result alias used throughout the crate.
pub type CResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A transaction context exhausted its generation region (spec.md
    /// §4.1, §6, §7 case 1): more than `GEN_TX_SIZE - 6` generations were
    /// minted by a single transaction context.
    RepresentationError(&'static str),

    /// An operation that requires an active transaction context was called
    /// with none active on the current thread.
    NotInTransaction,

    /// `transaction/3`'s `lock` argument named a mutex that is already held
    /// by a different, non-reentrant acquisition path, or the constraint
    /// goal could not run under it.
    LockUnavailable(String),

    /// An update-listener hook rejected an announced event. Spec.md §7
    /// case 4 treats this exactly like goal failure: discard runs, then
    /// the rejection is surfaced.
    UpdateRejected(String),

    /// A hook invoked during discard failed (spec.md §7 case 5). Discard
    /// still runs to completion; this is the first such error collected.
    HookFailed(String),

    /// Internal invariant violation (e.g. trail corruption, a clause
    /// observed with `created > erased`). Per spec.md §7, these are fatal
    /// and are not meant to be caught by callers.
    Internal(String),

    /// Carries a goal or constraint failure/exception back across the
    /// transaction boundary unchanged, after rollback has completed.
    Goal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RepresentationError(what) => {
                write!(f, "representation_error({what})")
            }
            Error::NotInTransaction => write!(f, "no active transaction on this thread"),
            Error::LockUnavailable(name) => write!(f, "lock unavailable: {name}"),
            Error::UpdateRejected(reason) => write!(f, "update listener rejected event: {reason}"),
            Error::HookFailed(reason) => write!(f, "rollback hook failed: {reason}"),
            Error::Internal(reason) => write!(f, "internal invariant violation: {reason}"),
            Error::Goal(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for Error {}
