//! The per-transaction trail (spec.md §3 "Trail entry", §4.3, §9).
//!
//! The original implementation encodes a trail entry's tag in the same
//! machine word as a generation (`GEN_ASSERTA`/`GEN_ASSERTZ`/
//! `GEN_NESTED_RETRACT` are reserved pointer-sized sentinels). Spec.md §9
//! calls that out as exactly the kind of thing a rewrite should replace
//! with a real tagged variant, "eliminating collision risk by
//! construction" -- so here a trail entry's value is a plain enum.

use std::collections::HashMap;
use std::sync::Arc;

use crate::clause::ClauseHandle;
use crate::generation::Gen;

/// What happened to a clause inside a single transaction context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailTag {
    /// Asserted at the start of the predicate's clause list in this TC.
    Asserta,
    /// Asserted at the end of the predicate's clause list in this TC.
    Assertz,
    /// Retracted in this TC; `erased` has already been stamped (visible to
    /// this TC and any of its nested children), the outer scope has not
    /// committed. The value is the clause whose `erased` must be restored
    /// to `gen_max` on discard (spec.md §4.5, §9).
    NestedRetract,
    /// A globally visible clause retracted in this TC. The payload is the
    /// *local* generation offset within this TC's region
    /// (`lgen = next_generation(predicate) - gen_base`), per spec.md §3/§4.3.
    Retract(Gen),
    /// A clause asserted and then retracted within the same transaction
    /// context. Spec.md §9 leaves this case as an open hazard in the
    /// original and directs a rewrite to record it in the trail (option
    /// (a)) so commit can rewrite its generation out of the TC's region;
    /// this tag exists purely for that bookkeeping and carries no separate
    /// generation of its own -- the clause's `created`/`erased` already
    /// encode the change.
    LocalRetract,
}

impl TrailTag {
    pub fn is_assert(&self) -> bool {
        matches!(self, TrailTag::Asserta | TrailTag::Assertz)
    }
}

/// The per-TC log of modifications, keyed by clause (spec.md §3, §4.3).
/// The trail owns a reference on every clause it names, released when the
/// trail is destroyed by commit or discard.
pub struct Trail {
    entries: HashMap<ClauseId, (Arc<ClauseHandle>, TrailTag)>,
}

type ClauseId = u64;

impl Trail {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Inserts a trail entry, acquiring a reference on the clause as
    /// spec.md §4.3 requires for every entry point (assert/retract).
    pub fn insert(&mut self, clause: Arc<ClauseHandle>, tag: TrailTag) {
        clause.acquire();
        self.entries.insert(clause.id, (clause, tag));
    }

    pub fn get(&self, clause_id: ClauseId) -> Option<(&Arc<ClauseHandle>, TrailTag)> {
        self.entries.get(&clause_id).map(|(c, t)| (c, *t))
    }

    /// Overwrites the tag of an existing entry without touching its
    /// reference count (spec.md §9's self-retract-of-local-assert case).
    pub fn retag(&mut self, clause_id: ClauseId, tag: TrailTag) {
        if let Some(entry) = self.entries.get_mut(&clause_id) {
            entry.1 = tag;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<ClauseHandle>, TrailTag)> {
        self.entries.values().map(|(c, t)| (c, *t))
    }

    pub fn into_iter_owned(mut self) -> impl Iterator<Item = (Arc<ClauseHandle>, TrailTag)> {
        std::mem::take(&mut self.entries).into_values()
    }

    /// Merges `other` into `self` (spec.md §4.6 nested commit), acquiring
    /// an additional reference on each merged clause exactly as the
    /// original's `merge_tables` does.
    pub fn merge_from(&mut self, mut other: Trail) {
        for (id, (clause, tag)) in std::mem::take(&mut other.entries) {
            clause.acquire();
            self.entries.insert(id, (clause, tag));
        }
    }
}

impl Default for Trail {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Trail {
    fn drop(&mut self) {
        for (clause, _tag) in self.entries.values() {
            clause.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64) -> Arc<ClauseHandle> {
        Arc::new(ClauseHandle::new(id, 1))
    }

    #[test]
    fn insert_acquires_a_reference() {
        let mut trail = Trail::new();
        let cl = handle(1);
        assert_eq!(cl.refcount(), 0);
        trail.insert(cl.clone(), TrailTag::Asserta);
        assert_eq!(cl.refcount(), 1);
        drop(trail);
        assert_eq!(cl.refcount(), 0);
    }

    #[test]
    fn merge_acquires_an_additional_reference() {
        let mut parent = Trail::new();
        let mut child = Trail::new();
        let cl = handle(1);
        child.insert(cl.clone(), TrailTag::Assertz);
        assert_eq!(cl.refcount(), 1);
        parent.merge_from(child);
        assert_eq!(cl.refcount(), 2);
        assert_eq!(parent.len(), 1);
    }
}
