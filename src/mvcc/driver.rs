//! `transaction/2,3` and `snapshot/1` (spec.md §4.6): the entry points
//! that open a transaction context, run a goal against it, and commit,
//! merge, or discard depending on how the goal finished.

use std::cell::RefCell;

use crate::clause::{ClauseHandle, PredicateId};
use crate::error::{CResult, Error};
use crate::store::ClauseStore;
use crate::trail::Trail;
use crate::updates::UpdateEvent;
use std::sync::Arc;

use super::commit;
use super::discard;
use super::lock::LockRegistry;
use super::ops::{self, Position};
use super::transaction::{TransactionContext, TxKind};

thread_local! {
    /// The transaction context active on this thread, if any. At most one
    /// is ever installed directly -- nesting is modeled by mutating it in
    /// place (spec.md §4.6), not by stacking several.
    static CURRENT_TX: RefCell<Option<TransactionContext>> = RefCell::new(None);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionOptions {
    /// Bulk update mode (spec.md §4.7): updates are delivered as one
    /// batch at commit rather than as they are staged.
    pub bulk: bool,
}

/// The transaction-aware front door onto a [`ClauseStore`]: assert,
/// retract, and the `transaction`/`snapshot` entry points all go through
/// here (spec.md §4.6, §4.8).
pub struct Transactions<'a> {
    store: &'a ClauseStore,
    locks: &'a LockRegistry,
}

impl<'a> Transactions<'a> {
    pub fn new(store: &'a ClauseStore, locks: &'a LockRegistry) -> Self {
        Self { store, locks }
    }

    pub fn store(&self) -> &ClauseStore {
        self.store
    }

    /// `assert(predicate, position)`: requires an active transaction
    /// context on this thread (spec.md §4.3).
    pub fn assert(&self, predicate: PredicateId, position: Position) -> CResult<Arc<ClauseHandle>> {
        CURRENT_TX.with(|cell| {
            let mut slot = cell.borrow_mut();
            let tc = slot.as_mut().ok_or(Error::NotInTransaction)?;
            ops::assert_clause(tc, self.store, predicate, position)
        })
    }

    /// `retract(clause)`: requires an active transaction context on this
    /// thread (spec.md §4.3).
    pub fn retract(&self, clause: &Arc<ClauseHandle>) -> CResult<()> {
        CURRENT_TX.with(|cell| {
            let mut slot = cell.borrow_mut();
            let tc = slot.as_mut().ok_or(Error::NotInTransaction)?;
            ops::retract_clause(tc, clause)
        })
    }

    /// `visible(clause)`: reads through the current transaction context,
    /// or the global timeline if none is active (spec.md §4.2).
    pub fn visible(&self, clause: &ClauseHandle) -> bool {
        CURRENT_TX.with(|cell| {
            let slot = cell.borrow();
            match slot.as_ref() {
                Some(tc) => crate::visibility::visible(clause, tc.generation, Some(tc)),
                None => crate::visibility::visible(clause, self.store.global_generation(), None),
            }
        })
    }

    /// `current_transaction/1` (spec.md §4.8, §6): the identifying goals of
    /// the current transaction context and its parent chain, enumerated
    /// from innermost outward. Empty when no transaction is open on this
    /// thread.
    pub fn current_transaction(&self) -> Vec<String> {
        CURRENT_TX.with(|cell| {
            cell.borrow()
                .as_ref()
                .map(|tc| tc.ids.iter().rev().cloned().collect())
                .unwrap_or_default()
        })
    }

    /// `transaction_updates/1` (spec.md §2, §4.8): the pending update list
    /// for the currently open transaction, derived live from its
    /// not-yet-committed trail. Empty when no transaction is open, or once
    /// it has none staged yet.
    pub fn transaction_updates(&self) -> Vec<UpdateEvent> {
        CURRENT_TX.with(|cell| {
            cell.borrow()
                .as_ref()
                .map(|tc| commit::pending_updates(&tc.trail, self.store))
                .unwrap_or_default()
        })
    }

    /// `transaction(Goal)` (spec.md §2, §4.6).
    pub fn transaction(
        &self,
        id: impl Into<String>,
        goal: impl FnOnce(&Transactions) -> CResult<bool>,
    ) -> CResult<bool> {
        self.run(id.into(), TxKind::Transaction, TransactionOptions::default(), goal)
    }

    /// `transaction(Goal)` with [`TransactionOptions`] (spec.md §4.7's
    /// bulk-update mode).
    pub fn transaction_with_options(
        &self,
        id: impl Into<String>,
        goal: impl FnOnce(&Transactions) -> CResult<bool>,
        options: TransactionOptions,
    ) -> CResult<bool> {
        self.run(id.into(), TxKind::Transaction, options, goal)
    }

    /// `transaction(Goal, Constraint, Lock)` (spec.md §4.6): `Lock` names a
    /// mutex serializing this transaction against others naming the same
    /// lock; `Constraint` runs under the same transaction context as
    /// `Goal`, before anything is committed, so that a failing constraint
    /// rolls back `Goal`'s writes along with its own -- matching
    /// `pl-transaction.c:488-507`, which only commits once `rc` reflects
    /// both `Goal` and `Constraint`.
    pub fn transaction_with_constraint(
        &self,
        id: impl Into<String>,
        goal: impl FnOnce(&Transactions) -> CResult<bool>,
        constraint: impl FnOnce(&Transactions) -> CResult<bool>,
        lock_name: &str,
    ) -> CResult<bool> {
        let lock = self.locks.named(lock_name);
        let _guard =
            lock.lock().map_err(|_| Error::LockUnavailable(lock_name.to_string()))?;

        let constraint_failed = std::cell::Cell::new(false);
        let committed = self.transaction(id, |txs| {
            if !goal(txs)? {
                return Ok(false);
            }
            if !constraint(txs)? {
                constraint_failed.set(true);
                return Ok(false);
            }
            Ok(true)
        })?;

        if !committed && constraint_failed.get() {
            return Err(Error::Goal(format!("constraint failed under lock {lock_name}")));
        }
        Ok(committed)
    }

    /// `snapshot(Goal)` (spec.md §2, §4.6): always discards, regardless
    /// of how `Goal` finishes.
    pub fn snapshot(
        &self,
        id: impl Into<String>,
        goal: impl FnOnce(&Transactions) -> CResult<bool>,
    ) -> CResult<bool> {
        self.run(id.into(), TxKind::Snapshot, TransactionOptions::default(), goal)
    }

    fn run(
        &self,
        id: String,
        kind: TxKind,
        options: TransactionOptions,
        goal: impl FnOnce(&Transactions) -> CResult<bool>,
    ) -> CResult<bool> {
        let nested = CURRENT_TX.with(|cell| cell.borrow().is_some());
        if nested {
            self.run_nested(id, kind, options, goal)
        } else {
            self.run_root(id, kind, options, goal)
        }
    }

    fn run_root(
        &self,
        id: String,
        kind: TxKind,
        options: TransactionOptions,
        goal: impl FnOnce(&Transactions) -> CResult<bool>,
    ) -> CResult<bool> {
        let (gen_base, gen_max) = self.store.region_for_current_thread()?;
        let gen_start = self.store.global_generation();
        let tc = TransactionContext::begin_root(id, gen_base, gen_max, gen_start, kind, options.bulk);
        CURRENT_TX.with(|cell| *cell.borrow_mut() = Some(tc));

        log::debug!("transaction started at generation {gen_start}");
        let result = goal(self);

        let tc = CURRENT_TX.with(|cell| cell.borrow_mut().take()).expect("tc installed above");
        self.finish(tc.trail, kind, result)
    }

    fn run_nested(
        &self,
        id: String,
        kind: TxKind,
        options: TransactionOptions,
        goal: impl FnOnce(&Transactions) -> CResult<bool>,
    ) -> CResult<bool> {
        let frame = CURRENT_TX.with(|cell| {
            let mut slot = cell.borrow_mut();
            let tc = slot.as_mut().expect("run_nested called with no parent");
            tc.push_nested(id, kind, options.bulk)
        });

        log::debug!("nested transaction started");
        let result = goal(self);

        let child_trail = CURRENT_TX.with(|cell| {
            let mut slot = cell.borrow_mut();
            let tc = slot.as_mut().expect("parent still installed");
            let child_trail = tc.take_trail();
            tc.pop_nested(frame);
            child_trail
        });

        match (&result, kind) {
            (Ok(true), TxKind::Transaction) => {
                CURRENT_TX.with(|cell| {
                    let mut slot = cell.borrow_mut();
                    let tc = slot.as_mut().expect("parent still installed");
                    tc.trail.merge_from(child_trail);
                });
                Ok(true)
            }
            _ => {
                discard::discard(child_trail);
                result
            }
        }
    }

    fn finish(&self, trail: Trail, kind: TxKind, result: CResult<bool>) -> CResult<bool> {
        match result {
            Err(e) => {
                discard::discard(trail);
                Err(e)
            }
            Ok(success) => {
                if matches!(kind, TxKind::Snapshot) || !success {
                    discard::discard(trail);
                    Ok(success)
                } else {
                    let (gen_commit, events) = commit::commit(&trail, self.store)?;
                    self.announce(events, gen_commit)?;
                    Ok(true)
                }
            }
        }
    }

    fn announce(&self, events: Vec<UpdateEvent>, gen_commit: crate::generation::Gen) -> CResult<()> {
        for event in &events {
            self.store.notify_update(event)?;
        }
        self.store.record_updates(events);
        log::info!("transaction committed at generation {gen_commit}");
        Ok(())
    }
}
