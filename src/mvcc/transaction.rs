//! The transaction context (spec.md §3 "Transaction Context (TC)", §4.6).
//!
//! One `TransactionContext` is live per thread at a time; nesting is
//! handled by the driver saving and restoring its mutable fields rather
//! than by allocating a new one per level (spec.md §4.6, §9), mirroring
//! the original's single `LD->transaction` struct plus an intrusive save
//! stack.

use crate::generation::Gen;
use crate::trail::Trail;

/// Which kind of transaction this TC represents (spec.md §2, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    /// An ordinary transaction: on success its trail is committed or
    /// merged into its parent; on failure it is discarded.
    Transaction,
    /// A snapshot: always discarded, regardless of how its goal finishes
    /// (spec.md §2, §4.6).
    Snapshot,
}

#[derive(Debug, Clone, Copy)]
pub struct TxFlags {
    pub kind: TxKind,
    /// Bulk update mode (spec.md §4.7): updates are collected and
    /// announced once at commit instead of inline as they're staged.
    pub bulk: bool,
}

/// The fields saved across a nested transaction and restored on exit
/// (spec.md §4.6 step 1). `gen_base`, `gen_max`, and `gen_start` are
/// shared with the whole TC family and are not part of this frame. The
/// identifying ids live on `TransactionContext::ids` directly, pushed and
/// popped in lockstep with nesting rather than saved here.
pub(crate) struct ParentFrame {
    pub generation: Gen,
    pub gen_nest: Gen,
    pub trail: Trail,
    pub flags: TxFlags,
}

/// Per-thread transaction state (spec.md §3).
pub struct TransactionContext {
    /// The identifying goal of this transaction and every enclosing one
    /// still open, outermost first (spec.md §4.8). `current_transaction/1`
    /// walks this from the back outward. Opaque outside this crate; carried
    /// here as text.
    pub ids: Vec<String>,
    /// First generation reserved for this thread's region (spec.md §6).
    pub gen_base: Gen,
    /// Last generation reserved for this thread's region, six short of
    /// the next region's base (spec.md §6).
    pub gen_max: Gen,
    /// The global generation in effect when this (outermost) TC began;
    /// used by the visibility oracle's snapshot rule (spec.md §4.2).
    pub gen_start: Gen,
    /// The next private generation this TC will mint, also this TC's
    /// current read generation (spec.md §4.1, §4.2).
    pub generation: Gen,
    /// The parent's `generation` at the point this (possibly nested) TC
    /// began; clauses asserted by an ancestor are staged above this
    /// line (spec.md §4.3, §9).
    pub gen_nest: Gen,
    /// This TC's trail of asserts and retracts (spec.md §3, §4.3).
    pub trail: Trail,
    pub flags: TxFlags,
}

impl TransactionContext {
    /// Begins an outermost transaction context, reserving this thread's
    /// region and capturing the current global generation as the
    /// snapshot point (spec.md §4.6 step 0).
    pub fn begin_root(
        id: impl Into<String>,
        gen_base: Gen,
        gen_max: Gen,
        gen_start: Gen,
        kind: TxKind,
        bulk: bool,
    ) -> Self {
        Self {
            ids: vec![id.into()],
            gen_base,
            gen_max,
            gen_start,
            generation: gen_base,
            gen_nest: gen_base,
            trail: Trail::new(),
            flags: TxFlags { kind, bulk },
        }
    }

    /// The innermost active transaction's identifying goal.
    pub fn id(&self) -> &str {
        self.ids.last().expect("ids is never empty")
    }

    /// Mints the next private generation for an assert, failing if this
    /// TC's region is exhausted (spec.md §4.3, §6 edge case).
    pub fn mint_generation(&mut self) -> crate::error::CResult<Gen> {
        if self.generation >= self.gen_max {
            return Err(crate::error::Error::RepresentationError("transaction_generations"));
        }
        let g = self.generation;
        self.generation += 1;
        Ok(g)
    }

    /// Saves this TC's mutable, per-level fields into a frame and resets
    /// them for a nested transaction (spec.md §4.6 step 1). `gen_base`,
    /// `gen_max`, and `gen_start` are left untouched -- the whole family
    /// shares one region and one snapshot point. The new id is pushed onto
    /// `ids` rather than carried in the frame, so the full enclosing chain
    /// stays enumerable for `current_transaction/1` (spec.md §4.8) while a
    /// nested transaction is open.
    pub(crate) fn push_nested(
        &mut self,
        id: impl Into<String>,
        kind: TxKind,
        bulk: bool,
    ) -> ParentFrame {
        let frame = ParentFrame {
            generation: self.generation,
            gen_nest: self.gen_nest,
            trail: std::mem::replace(&mut self.trail, Trail::new()),
            flags: self.flags,
        };
        self.ids.push(id.into());
        self.gen_nest = self.generation;
        self.flags = TxFlags { kind, bulk };
        frame
    }

    /// Restores the parent frame after a nested transaction has been
    /// committed or discarded (spec.md §4.6 step 4). Callers must pull the
    /// nested TC's own trail out with [`Self::take_trail`] first --
    /// otherwise it's dropped (and its clauses released) silently instead
    /// of being committed or discarded.
    pub(crate) fn pop_nested(&mut self, frame: ParentFrame) {
        self.ids.pop().expect("push_nested always pushed one");
        self.generation = frame.generation;
        self.gen_nest = frame.gen_nest;
        self.trail = frame.trail;
        self.flags = frame.flags;
    }

    /// Takes this TC's trail, leaving an empty one in its place.
    pub(crate) fn take_trail(&mut self) -> Trail {
        std::mem::take(&mut self.trail)
    }

    /// True when this TC has a parent (its nesting floor sits above this
    /// family's true region floor).
    pub fn is_nested(&self) -> bool {
        self.gen_nest != self.gen_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> TransactionContext {
        TransactionContext::begin_root("t", 100, 190, 10, TxKind::Transaction, false)
    }

    #[test]
    fn mint_generation_advances_and_bounds() {
        let mut tc = root();
        assert_eq!(tc.mint_generation().unwrap(), 100);
        assert_eq!(tc.mint_generation().unwrap(), 101);
        tc.generation = tc.gen_max;
        assert!(tc.mint_generation().is_err());
    }

    #[test]
    fn push_and_pop_nested_round_trips() {
        let mut tc = root();
        tc.mint_generation().unwrap();
        let before_gen = tc.generation;
        let frame = tc.push_nested("nested", TxKind::Transaction, false);
        assert!(tc.is_nested());
        assert_eq!(tc.gen_nest, before_gen);
        assert_eq!(tc.ids, vec!["t".to_string(), "nested".to_string()]);
        tc.mint_generation().unwrap();
        tc.pop_nested(frame);
        assert_eq!(tc.generation, before_gen);
        assert!(!tc.is_nested());
        assert_eq!(tc.ids, vec!["t".to_string()]);
    }
}
