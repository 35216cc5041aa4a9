//! Update events emitted by a committing transaction (spec.md §4.7).

use crate::clause::{ClauseId, PredicateId};
use crate::generation::Gen;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Assert,
    Retract,
}

/// One row of `transaction_updates/1` (spec.md §4.7, §4.8): what happened
/// to a single clause, at what generation it became effective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateEvent {
    pub predicate: PredicateId,
    pub clause: ClauseId,
    pub kind: UpdateKind,
    pub generation: Gen,
}
