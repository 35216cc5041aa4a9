//! In-memory predicate table (spec.md §1's clause-storage collaborator),
//! built the way the donor's `storage::memory::Memory` backs its `Engine`
//! trait: a plain lock-protected map, no persistence.

use std::sync::Arc;

use crate::clause::{ClauseHandle, ClauseId, PredicateId};
use crate::error::CResult;
use crate::generation::{Gen, GenerationClock, PredicateClock, ThreadRegions};
use crate::updates::UpdateEvent;

use super::Status;

pub(crate) struct Predicate {
    pub clock: PredicateClock,
    pub clauses: std::sync::Mutex<Vec<Arc<ClauseHandle>>>,
}

/// A minimal clause database: the collaborator the transaction engine in
/// this crate is built against. Not a clause indexing engine -- just
/// enough storage to assert, retract, and list clauses by predicate and
/// generation.
pub struct ClauseStore {
    pub(crate) predicates: std::sync::RwLock<std::collections::HashMap<PredicateId, Predicate>>,
    pub(crate) clock: GenerationClock,
    pub(crate) regions: ThreadRegions,
    next_clause_id: std::sync::atomic::AtomicU64,
    /// Supplement from SPEC_FULL.md §2: an injectable predicate recognizing
    /// compiled-trie clauses, which `collect_updates` (spec.md §4.7) must
    /// filter out. Defaults to "nothing is a trie clause".
    is_trie_clause: Box<dyn Fn(&ClauseHandle) -> bool + Send + Sync>,
    /// Supplement from SPEC_FULL.md §2: an injectable update listener,
    /// invoked once per event as a transaction's updates are announced
    /// (spec.md §4.7, §7 case 4). Defaults to accepting everything.
    update_listener: Box<dyn Fn(&UpdateEvent) -> CResult<()> + Send + Sync>,
    /// The most recently committed transaction's updates, for
    /// `transaction_updates/1`-style introspection (spec.md §4.8).
    last_updates: std::sync::Mutex<Vec<UpdateEvent>>,
}

impl ClauseStore {
    pub fn new() -> Self {
        Self {
            predicates: std::sync::RwLock::new(std::collections::HashMap::new()),
            clock: GenerationClock::new(),
            regions: ThreadRegions::new(),
            next_clause_id: std::sync::atomic::AtomicU64::new(1),
            is_trie_clause: Box::new(|_| false),
            update_listener: Box::new(|_| Ok(())),
            last_updates: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Installs the trie-clause recognizer described in SPEC_FULL.md §2.
    pub fn with_trie_clause_predicate(
        mut self,
        f: impl Fn(&ClauseHandle) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_trie_clause = Box::new(f);
        self
    }

    /// Installs the update listener described in SPEC_FULL.md §2.
    pub fn with_update_listener(
        mut self,
        f: impl Fn(&UpdateEvent) -> CResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.update_listener = Box::new(f);
        self
    }

    pub fn is_trie_clause(&self, clause: &ClauseHandle) -> bool {
        (self.is_trie_clause)(clause)
    }

    pub(crate) fn notify_update(&self, event: &UpdateEvent) -> CResult<()> {
        (self.update_listener)(event)
    }

    pub(crate) fn record_updates(&self, events: Vec<UpdateEvent>) {
        *self.last_updates.lock().unwrap() = events;
    }

    /// `transaction_updates/1` (spec.md §4.8): the events from the most
    /// recently committed transaction.
    pub fn last_updates(&self) -> Vec<UpdateEvent> {
        self.last_updates.lock().unwrap().clone()
    }

    /// The `(gen_base, gen_max)` region reserved for the calling thread
    /// (spec.md §6), assigning one on first use.
    pub fn region_for_current_thread(&self) -> CResult<(Gen, Gen)> {
        self.regions.region_for_current_thread()
    }

    fn ensure_predicate(&self, predicate: PredicateId) {
        if self.predicates.read().unwrap().contains_key(&predicate) {
            return;
        }
        let mut predicates = self.predicates.write().unwrap();
        predicates.entry(predicate).or_insert_with(|| Predicate {
            clock: PredicateClock::new(0),
            clauses: std::sync::Mutex::new(Vec::new()),
        });
    }

    /// Allocates a fresh, not-yet-visible clause handle for `predicate`.
    pub fn new_clause(&self, predicate: PredicateId) -> Arc<ClauseHandle> {
        self.ensure_predicate(predicate);
        let id: ClauseId = self.next_clause_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let handle = Arc::new(ClauseHandle::new(id, predicate));
        self.predicates
            .read()
            .unwrap()
            .get(&predicate)
            .unwrap()
            .clauses
            .lock()
            .unwrap()
            .push(handle.clone());
        handle
    }

    /// `next_generation(predicate)` (spec.md §4.1): advances the
    /// predicate's local clock, bounded by `gen_max` if given.
    pub fn next_generation(&self, predicate: PredicateId, gen_max: Option<Gen>) -> CResult<Gen> {
        self.ensure_predicate(predicate);
        self.predicates.read().unwrap().get(&predicate).unwrap().clock.next_generation(gen_max)
    }

    /// Publishes a retraction into the global timeline: sets `erased` to
    /// `gen`, and hard-erases the clause so it can eventually be reclaimed
    /// by whatever owns clause lifecycle outside this crate (spec.md §1, §3).
    ///
    /// Idempotent against the double-retract race spec.md §5 documents: two
    /// transactions can each stage a retract of the same globally-visible
    /// clause and then race to commit. Whichever gets here first stamps
    /// `erased` and hard-erases the clause; the second sees
    /// `is_hard_erased()` already set and skips re-publishing rather than
    /// clobbering the first stamp. Returns whether this call actually
    /// published.
    pub fn retract_clause(&self, clause: &ClauseHandle, gen: Gen) -> bool {
        if clause.is_hard_erased() {
            return false;
        }
        clause.set_erased(gen);
        clause.mark_hard_erased();
        true
    }

    pub fn global_generation(&self) -> Gen {
        self.clock.global_generation()
    }

    pub fn status(&self) -> Status {
        let predicates = self.predicates.read().unwrap();
        let clauses: u64 =
            predicates.values().map(|p| p.clauses.lock().unwrap().len() as u64).sum();
        Status {
            generation: self.global_generation(),
            predicates: predicates.len() as u64,
            clauses,
        }
    }

    /// All clause handles currently recorded for `predicate`, regardless
    /// of visibility. Callers filter with the visibility oracle.
    pub fn clauses_of(&self, predicate: PredicateId) -> Vec<Arc<ClauseHandle>> {
        self.ensure_predicate(predicate);
        self.predicates.read().unwrap().get(&predicate).unwrap().clauses.lock().unwrap().clone()
    }
}

impl Default for ClauseStore {
    fn default() -> Self {
        Self::new()
    }
}
