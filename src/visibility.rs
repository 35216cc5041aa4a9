//! The visibility oracle (spec.md §4.2): the single predicate every read
//! goes through, whether or not a transaction context is active.

use crate::clause::ClauseHandle;
use crate::generation::{region_of, Gen};
use crate::mvcc::transaction::TransactionContext;
use crate::trail::TrailTag;

/// `base_rule(clause, gen)`: a clause is visible at `gen` iff it was
/// created at or before `gen` and not yet erased by `gen`.
fn base_rule(clause: &ClauseHandle, gen: Gen) -> bool {
    clause.created() <= gen && gen < clause.erased()
}

/// `visible(clause, gen, tc)` (spec.md §4.2).
///
/// Outside a transaction context this is just `base_rule`. Inside one,
/// reads use the TC's own `generation` as `gen`, with one refinement: a
/// clause that was already globally visible when the TC began is judged
/// by the *snapshot* it took at `gen_start`, not by whatever has happened
/// in the global timeline since -- unless this TC itself retracted it.
pub fn visible(clause: &ClauseHandle, gen: Gen, tc: Option<&TransactionContext>) -> bool {
    let tc = match tc {
        None => return base_rule(clause, gen),
        Some(tc) => tc,
    };

    let created = clause.created();
    let erased = clause.erased();

    if created <= tc.gen_start && tc.gen_start < erased {
        // Globally visible when this TC took its snapshot: visible unless
        // this TC staged a retraction of it.
        if let Some((_, TrailTag::Retract(lgen))) = tc.trail.get(clause.id) {
            if lgen + tc.gen_base <= gen {
                return false;
            }
        }
        return true;
    }

    if region_of(created).is_some() {
        // Minted inside some transaction's own region -- this TC's or an
        // ancestor's, reachable through nested commit having already
        // rewritten `created`/`erased` in place. Ordinary comparison
        // against the TC's own generation decides it.
        return base_rule(clause, gen);
    }

    // Committed to the global timeline after this TC's snapshot was taken:
    // isolated away regardless of the raw generation comparison.
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::ClauseHandle;
    use crate::generation::GEN_TX_BASE;
    use crate::mvcc::transaction::{TransactionContext, TxFlags, TxKind};
    use crate::trail::Trail;

    fn tc(gen_start: Gen) -> TransactionContext {
        TransactionContext {
            ids: vec!["t".into()],
            gen_base: GEN_TX_BASE,
            gen_max: GEN_TX_BASE + crate::generation::GEN_TX_SIZE - 6,
            gen_start,
            generation: GEN_TX_BASE,
            gen_nest: GEN_TX_BASE,
            trail: Trail::new(),
            flags: TxFlags { kind: TxKind::Transaction, bulk: false },
        }
    }

    #[test]
    fn no_tc_uses_base_rule() {
        let cl = ClauseHandle::new(1, 1);
        cl.publish_created(5);
        assert!(visible(&cl, 5, None));
        assert!(!visible(&cl, 4, None));
    }

    #[test]
    fn pre_existing_clause_visible_via_snapshot() {
        let cl = ClauseHandle::new(1, 1);
        cl.publish_created(5);
        let tc = tc(10);
        assert!(visible(&cl, tc.generation, Some(&tc)));
    }

    #[test]
    fn clause_committed_after_snapshot_is_invisible() {
        let cl = ClauseHandle::new(1, 1);
        cl.publish_created(20); // global commit happening after gen_start = 10
        let tc = tc(10);
        assert!(!visible(&cl, tc.generation, Some(&tc)));
    }

    #[test]
    fn clause_asserted_in_tc_region_uses_base_rule() {
        let cl = ClauseHandle::new(1, 1);
        let mut t = tc(10);
        cl.publish_created(t.generation);
        t.generation += 1;
        assert!(visible(&cl, t.generation, Some(&t)));
    }

    #[test]
    fn retract_in_tc_hides_pre_existing_clause() {
        let cl = std::sync::Arc::new(ClauseHandle::new(1, 1));
        cl.publish_created(5);
        let mut t = tc(10);
        let lgen = t.generation - t.gen_base;
        t.trail.insert(cl.clone(), TrailTag::Retract(lgen));
        assert!(!visible(&cl, t.generation, Some(&t)));
    }
}
