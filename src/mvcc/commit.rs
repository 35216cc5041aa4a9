//! The commit protocol (spec.md §4.4): takes the single global generation
//! lock, rewrites every trailed clause's TC-local generation into the
//! published timeline, and hands back the events a listener should see.

use crate::error::CResult;
use crate::generation::{Gen, GEN_DEAD_COMMIT_RACE, GEN_DEAD_DISCARDED};
use crate::store::ClauseStore;
use crate::trail::{Trail, TrailTag};
use crate::updates::{UpdateEvent, UpdateKind};

/// Commits a trail at the outermost level: acquires the generation lock,
/// stamps every entry with `gen_commit = global_generation() + 1`, and
/// publishes the new `G` only once every entry has been rewritten.
pub fn commit(trail: &Trail, store: &ClauseStore) -> CResult<(Gen, Vec<UpdateEvent>)> {
    let gen_commit = store.clock.with_commit_lock(|gen_commit| {
        for (clause, tag) in trail.iter() {
            match tag {
                TrailTag::Asserta | TrailTag::Assertz => {
                    if clause.is_hard_erased() {
                        clause.stamp_dead(GEN_DEAD_COMMIT_RACE);
                    } else {
                        clause.publish_created(gen_commit);
                    }
                }
                TrailTag::Retract(_) | TrailTag::NestedRetract => {
                    // spec.md §5's double-retract race: a second committer
                    // racing to publish the same clause's erasure sees
                    // `is_hard_erased()` already set by the first and must
                    // skip re-publishing, but it still closes out its own
                    // open claim on the clause.
                    store.retract_clause(clause, gen_commit);
                    clause.dec_tr_erased_no();
                }
                TrailTag::LocalRetract => {
                    // Never became visible to anything outside this TC;
                    // collapse it the same way a discard would.
                    clause.stamp_dead(GEN_DEAD_DISCARDED);
                    clause.mark_hard_erased();
                }
            }
        }
        Ok(gen_commit)
    })?;

    let events = pending_updates(trail, store);
    Ok((gen_commit, events))
}

/// Projects a trail's asserts and retracts into the
/// `transaction_updates/1`-shaped events they will produce (spec.md §4.7,
/// §4.8), filtering out compiled-trie clauses and local-only collapses,
/// sorted by effective generation (spec.md §6). Each event's generation is
/// read straight off the clause -- its staged `created` for an assert, its
/// staged `erased` for a retract -- so this doubles as a live, pre-commit
/// read of the currently open transaction's pending updates and as the
/// post-commit event list, without needing a separate "what generation did
/// this land at" parameter.
pub fn pending_updates(trail: &Trail, store: &ClauseStore) -> Vec<UpdateEvent> {
    let mut events: Vec<UpdateEvent> = trail
        .iter()
        .filter(|(clause, _)| !store.is_trie_clause(clause))
        .filter_map(|(clause, tag)| match tag {
            TrailTag::Asserta | TrailTag::Assertz => Some(UpdateEvent {
                predicate: clause.predicate,
                clause: clause.id,
                kind: UpdateKind::Assert,
                generation: clause.created(),
            }),
            TrailTag::Retract(_) | TrailTag::NestedRetract => Some(UpdateEvent {
                predicate: clause.predicate,
                clause: clause.id,
                kind: UpdateKind::Retract,
                generation: clause.erased(),
            }),
            TrailTag::LocalRetract => None,
        })
        .collect();
    events.sort_by_key(|e| (e.generation, e.clause));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_publishes_asserted_clause_globally() {
        let store = ClauseStore::new();
        let cl = store.new_clause(1);
        cl.publish_created(crate::generation::GEN_TX_BASE);
        let mut trail = Trail::new();
        trail.insert(cl.clone(), TrailTag::Asserta);

        let (gen_commit, events) = commit(&trail, &store).unwrap();
        assert_eq!(cl.created(), gen_commit);
        assert_eq!(cl.erased(), crate::generation::GEN_MAX);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, UpdateKind::Assert);
    }

    #[test]
    fn commit_publishes_retraction_globally() {
        let store = ClauseStore::new();
        let cl = store.new_clause(1);
        cl.publish_created(5);
        cl.inc_tr_erased_no();
        let mut trail = Trail::new();
        trail.insert(cl.clone(), TrailTag::Retract(0));

        let (gen_commit, events) = commit(&trail, &store).unwrap();
        assert_eq!(cl.erased(), gen_commit);
        assert!(cl.is_hard_erased());
        assert_eq!(cl.tr_erased_no(), 0);
        assert_eq!(events[0].kind, UpdateKind::Retract);
    }

    #[test]
    fn second_committer_of_a_racing_retract_skips_republishing() {
        // spec.md §5: two transactions independently stage a retract of the
        // same globally-visible clause; whichever commits first wins the
        // `erased` stamp, the other must leave it alone.
        let store = ClauseStore::new();
        let cl = store.new_clause(1);
        cl.publish_created(5);
        cl.inc_tr_erased_no();
        cl.inc_tr_erased_no();

        let mut first = Trail::new();
        first.insert(cl.clone(), TrailTag::Retract(0));
        let (first_gen, _) = commit(&first, &store).unwrap();
        assert_eq!(cl.erased(), first_gen);
        assert!(cl.is_hard_erased());

        let mut second = Trail::new();
        second.insert(cl.clone(), TrailTag::Retract(1));
        let (_, _) = commit(&second, &store).unwrap();
        assert_eq!(cl.erased(), first_gen, "second committer must not clobber the first's stamp");
        assert_eq!(cl.tr_erased_no(), 0, "both committers still close out their own claim");
    }
}
