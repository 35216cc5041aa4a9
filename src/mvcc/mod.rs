//! Generation-based MVCC and nestable, isolated transactions (spec.md §2,
//! §3, §4).
//!
//! A transaction context (TC) partitions the generation timeline into a
//! small shared global region and a large private region per thread
//! (spec.md §6, [`crate::generation`]). While a TC is open, asserts and
//! retracts are staged into a trail ([`crate::trail`]) instead of touching
//! the global timeline directly; `commit` rewrites the trail into the
//! timeline under a single lock, `discard` unwinds it without ever taking
//! that lock (spec.md §4.4, §4.5). Nested transactions reuse their
//! parent's region and merge their trail into it on success (spec.md
//! §4.6).

pub mod commit;
pub mod discard;
pub mod driver;
pub mod lock;
pub mod ops;
pub mod transaction;

pub use driver::{TransactionOptions, Transactions};
pub use lock::LockRegistry;
pub use ops::Position;
pub use transaction::TxKind;
