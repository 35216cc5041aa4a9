//! Clause-level operations staged against an open transaction context
//! (spec.md §4.3).

use std::sync::Arc;

use crate::clause::{ClauseHandle, PredicateId};
use crate::error::{CResult, Error};
use crate::generation::region_of;
use crate::store::ClauseStore;
use crate::trail::TrailTag;

use super::transaction::TransactionContext;

/// Where a new clause is inserted relative to its predicate's existing
/// clauses, mirroring Prolog's `asserta/1` vs `assertz/1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Start,
    End,
}

/// `assert(predicate, position)` inside a TC (spec.md §4.3): mints this
/// TC's next private generation, stamps the clause live at it, and trails
/// the insertion so commit or discard can finish the job.
pub fn assert_clause(
    tc: &mut TransactionContext,
    store: &ClauseStore,
    predicate: PredicateId,
    position: Position,
) -> CResult<Arc<ClauseHandle>> {
    let handle = store.new_clause(predicate);
    let created = tc.mint_generation()?;
    handle.publish_created(created);
    let tag = match position {
        Position::Start => TrailTag::Asserta,
        Position::End => TrailTag::Assertz,
    };
    tc.trail.insert(handle.clone(), tag);
    Ok(handle)
}

/// `retract(clause)` inside a TC (spec.md §4.3, §9): dispatches on where
/// the clause was created relative to this TC's own nesting floor.
pub fn retract_clause(
    tc: &mut TransactionContext,
    clause: &Arc<ClauseHandle>,
) -> CResult<()> {
    let created = clause.created();

    if region_of(created).is_some() && created < tc.gen_nest {
        // Asserted by a still-open ancestor transaction: stage the erasure
        // directly so this TC and its children see it retracted, but leave
        // a trail entry so a discard can restore `erased = gen_max`.
        let egen = tc.mint_generation()?;
        clause.set_erased(egen);
        clause.inc_tr_erased_no();
        tc.trail.insert(clause.clone(), TrailTag::NestedRetract);
        return Ok(());
    }

    if region_of(created).is_some() && created >= tc.gen_nest {
        // Asserted by this exact TC: nobody outside this TC has ever seen
        // it, so collapse it in place rather than minting a public
        // retraction generation (spec.md §9, option (a)).
        let now = tc.generation;
        clause.set_erased(now);
        tc.trail.retag(clause.id, TrailTag::LocalRetract);
        return Ok(());
    }

    if created <= tc.gen_start {
        // Globally visible when this TC's snapshot was taken: the common
        // case. `next_generation(predicate)` under an active TC draws from
        // the TC's own region (spec.md §4.1), so this is just another
        // private generation.
        let lgen = tc.mint_generation()? - tc.gen_base;
        clause.inc_tr_erased_no();
        tc.trail.insert(clause.clone(), TrailTag::Retract(lgen));
        return Ok(());
    }

    // A clause committed globally after this TC's snapshot was taken is
    // not supposed to be reachable by this TC's reads in the first place.
    Err(Error::Internal("retract of a clause invisible to this transaction".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GEN_TX_BASE;
    use crate::mvcc::transaction::TxKind;

    fn tc() -> TransactionContext {
        TransactionContext::begin_root(
            "t",
            GEN_TX_BASE,
            GEN_TX_BASE + crate::generation::GEN_TX_SIZE - 6,
            10,
            TxKind::Transaction,
            false,
        )
    }

    #[test]
    fn assert_then_local_retract_collapses_in_place() {
        let store = ClauseStore::new();
        let mut t = tc();
        let cl = assert_clause(&mut t, &store, 1, Position::End).unwrap();
        assert!(cl.created() < cl.erased());
        retract_clause(&mut t, &cl).unwrap();
        assert!(cl.erased() <= t.generation);
        assert_eq!(t.trail.get(cl.id).unwrap().1, TrailTag::LocalRetract);
    }

    #[test]
    fn retract_pre_existing_clause_trails_an_offset() {
        let store = ClauseStore::new();
        let cl = store.new_clause(1);
        cl.publish_created(5);
        let mut t = tc();
        retract_clause(&mut t, &cl).unwrap();
        match t.trail.get(cl.id).unwrap().1 {
            TrailTag::Retract(lgen) => assert_eq!(lgen, 0),
            other => panic!("expected Retract, got {other:?}"),
        }
        assert_eq!(cl.tr_erased_no(), 1);
    }
}
