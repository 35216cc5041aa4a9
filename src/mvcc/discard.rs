//! The discard protocol (spec.md §4.5): unwinds a trail without ever
//! touching the global generation clock. Used for a failed transaction, a
//! snapshot (which always discards), and a nested transaction that failed
//! or was itself discarded.

use crate::generation::{GEN_DEAD_DISCARDED, GEN_DEAD_DISCARDED_ERASED, GEN_MAX};
use crate::trail::{Trail, TrailTag};

pub fn discard(trail: Trail) {
    for (clause, tag) in trail.iter() {
        match tag {
            TrailTag::Asserta | TrailTag::Assertz => {
                clause.stamp_dead(GEN_DEAD_DISCARDED);
                clause.mark_hard_erased();
            }
            TrailTag::NestedRetract => {
                clause.set_erased(GEN_MAX);
                clause.dec_tr_erased_no();
            }
            TrailTag::Retract(_) => {
                clause.dec_tr_erased_no();
            }
            TrailTag::LocalRetract => {
                clause.stamp_dead(GEN_DEAD_DISCARDED_ERASED);
                clause.mark_hard_erased();
            }
        }
    }
    // Dropping `trail` here releases the reference each entry acquired.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::ClauseHandle;
    use crate::generation::GEN_TX_BASE;
    use std::sync::Arc;

    #[test]
    fn discard_hard_retracts_a_local_assert() {
        let cl = Arc::new(ClauseHandle::new(1, 1));
        cl.publish_created(GEN_TX_BASE);
        let mut trail = Trail::new();
        trail.insert(cl.clone(), TrailTag::Asserta);
        discard(trail);
        assert!(cl.is_hard_erased());
        assert_eq!(cl.created(), GEN_DEAD_DISCARDED);
    }

    #[test]
    fn discard_restores_nested_retract() {
        let cl = Arc::new(ClauseHandle::new(1, 1));
        cl.publish_created(5);
        cl.set_erased(GEN_TX_BASE + 3);
        cl.inc_tr_erased_no();
        let mut trail = Trail::new();
        trail.insert(cl.clone(), TrailTag::NestedRetract);
        discard(trail);
        assert_eq!(cl.erased(), GEN_MAX);
        assert_eq!(cl.tr_erased_no(), 0);
    }
}
