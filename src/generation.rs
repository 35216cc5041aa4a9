//! Generation clock and thread-region partitioning (spec.md §4.1, §6).
//!
//! `Gen` is the database's logical clock: clauses are stamped with a
//! `created`/`erased` pair of generations, and a read at generation `g`
//! sees a clause iff `created <= g < erased`. The clock is split into a
//! small global region, used for values every reader agrees on, and
//! `2^31` disjoint per-thread *transaction regions* of `2^32` generations
//! each, so that concurrent transactions can mint new generations without
//! taking a shared lock on every write -- only `commit` takes the global
//! lock, and only to rewrite a transaction's own trail into the timeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::thread::ThreadId;
use std::collections::HashMap;

use crate::error::{CResult, Error};

/// A 64-bit logical timestamp.
pub type Gen = u64;

/// "Never erased" -- the `erased` value of a live clause.
pub const GEN_MAX: Gen = u64::MAX;

/// Size of a single thread's transaction region.
pub const GEN_TX_SIZE: u64 = 1 << 32;

/// Number of per-thread transaction regions the clock can hand out.
pub const GEN_TX_REGIONS: u64 = 1 << 31;

/// Start of the per-thread transaction region space. Chosen large enough
/// that the global region never needs to worry about running into it
/// during any realistic test or embedding, while leaving
/// `GEN_TX_BASE + GEN_TX_REGIONS * GEN_TX_SIZE` comfortably under `u64::MAX`.
pub const GEN_TX_BASE: Gen = 1 << 40;

/// The first generation value `commit` is ever allowed to publish into the
/// global region. Spec.md §6 reserves a handful of small dead-clause
/// sentinel values (2, 3, 4); fixing the first real commit generation at
/// 10 guarantees those sentinels can never collide with a generation any
/// clause actually lived at. Spec.md does not pin this constant down --
/// see DESIGN.md's Open Question log.
pub const GEN_FIRST_COMMIT: Gen = 10;

/// Reserved dead-clause generation: a freshly asserted clause discovered to
/// already be hard-deleted (`CL_ERASED`) at commit time is stamped here so
/// it is never visible (spec.md §4.4).
pub const GEN_DEAD_COMMIT_RACE: Gen = 2;

/// Reserved dead-clause generation: an asserted-then-discarded clause that
/// was never erased is stamped here before being hard-retracted (spec.md
/// §4.5).
pub const GEN_DEAD_DISCARDED: Gen = 3;

/// Reserved dead-clause generation: an asserted-then-retracted-then-discarded
/// clause is stamped here (spec.md §4.5).
pub const GEN_DEAD_DISCARDED_ERASED: Gen = 4;

fn region_bounds(region: u64) -> (Gen, Gen) {
    let gen_base = GEN_TX_BASE + region * GEN_TX_SIZE;
    let gen_max = gen_base + GEN_TX_SIZE - 6;
    (gen_base, gen_max)
}

/// Given any generation, returns the transaction region it belongs to, or
/// `None` if it lies in the global region.
pub fn region_of(gen: Gen) -> Option<u64> {
    if gen < GEN_TX_BASE {
        None
    } else {
        Some((gen - GEN_TX_BASE) / GEN_TX_SIZE)
    }
}

/// Assigns a stable, small region index to each thread that asks for one.
/// The original implementation keys this off the OS thread id directly;
/// Rust doesn't expose a small integer thread id portably, so this tracks
/// first-seen `ThreadId`s instead, bounded the same way (`GEN_TX_REGIONS`).
#[derive(Default)]
pub struct ThreadRegions {
    assigned: RwLock<HashMap<ThreadId, u64>>,
    next: AtomicU64,
}

impl ThreadRegions {
    pub fn new() -> Self {
        Self { assigned: RwLock::new(HashMap::new()), next: AtomicU64::new(0) }
    }

    /// Returns the `(gen_base, gen_max)` pair reserved for the calling
    /// thread, assigning a fresh region on first use.
    pub fn region_for_current_thread(&self) -> CResult<(Gen, Gen)> {
        let tid = std::thread::current().id();
        if let Some(region) = self.assigned.read().unwrap().get(&tid) {
            return Ok(region_bounds(*region));
        }

        let mut assigned = self.assigned.write().unwrap();
        if let Some(region) = assigned.get(&tid) {
            return Ok(region_bounds(*region));
        }
        let region = self.next.fetch_add(1, Ordering::SeqCst);
        if region >= GEN_TX_REGIONS {
            return Err(Error::RepresentationError("transaction_regions"));
        }
        assigned.insert(tid, region);
        Ok(region_bounds(region))
    }
}

/// The global generation clock `G`. Advanced only by `commit`, under the
/// generation lock (spec.md §4.4, §5).
pub struct GenerationClock {
    current: AtomicU64,
    commit_lock: Mutex<()>,
}

impl GenerationClock {
    pub fn new() -> Self {
        Self { current: AtomicU64::new(GEN_FIRST_COMMIT - 1), commit_lock: Mutex::new(()) }
    }

    /// `global_generation()` (spec.md §4.1): the latest published `G`.
    pub fn global_generation(&self) -> Gen {
        self.current.load(Ordering::Acquire)
    }

    /// Acquires the single global generation lock and runs `f` with the
    /// generation `commit` should publish (`global_generation() + 1`),
    /// publishing it with a release fence once `f` returns successfully.
    /// `f` returning `Err` leaves `G` unchanged.
    pub fn with_commit_lock<T>(
        &self,
        f: impl FnOnce(Gen) -> CResult<T>,
    ) -> CResult<T> {
        let _guard = self.commit_lock.lock().unwrap();
        let gen_commit = self.current.load(Ordering::Relaxed) + 1;
        let result = f(gen_commit)?;
        self.current.store(gen_commit, Ordering::Release);
        Ok(result)
    }
}

impl Default for GenerationClock {
    fn default() -> Self {
        Self::new()
    }
}

/// `next_generation(predicate)` (spec.md §4.1): mints the next generation
/// for a single predicate's local clock, used when stamping `erased` on a
/// retract. Bounded by the active transaction context's `gen_max`, if any.
pub struct PredicateClock {
    next: AtomicU64,
}

impl PredicateClock {
    pub fn new(start: Gen) -> Self {
        Self { next: AtomicU64::new(start) }
    }

    /// Mints the next generation, failing if it would exceed `gen_max`.
    pub fn next_generation(&self, gen_max: Option<Gen>) -> CResult<Gen> {
        let g = self.next.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = gen_max {
            if g > max {
                return Err(Error::RepresentationError("transaction_generations"));
            }
        }
        Ok(g)
    }
}
