//! `clausetx` is a transactional clause store: generation-based MVCC
//! visibility and nestable, isolated transactions for a logic-programming
//! runtime's predicate database.
//!
//! The pieces, bottom-up:
//!
//! - [`generation`]: the logical clock and the per-thread region scheme
//!   that lets transactions mint generations without a shared lock.
//! - [`clause`]: the per-clause `created`/`erased` pair every visibility
//!   check reads.
//! - [`trail`]: the per-transaction log of staged asserts and retracts.
//! - [`visibility`]: the one function every read, transactional or not,
//!   goes through.
//! - [`store`]: the minimal predicate table this crate is built against.
//! - [`mvcc`]: transaction contexts, commit, discard, and the
//!   `transaction`/`snapshot` entry points.
//!
//! ```
//! use clausetx::store::ClauseStore;
//! use clausetx::mvcc::{LockRegistry, Position, Transactions};
//!
//! let store = ClauseStore::new();
//! let locks = LockRegistry::new();
//! let txs = Transactions::new(&store, &locks);
//!
//! let committed = txs.transaction("demo", |txs| {
//!     txs.assert(1, Position::End)?;
//!     Ok(true)
//! }).unwrap();
//! assert!(committed);
//! ```

pub mod clause;
pub mod error;
pub mod generation;
pub mod mvcc;
pub mod store;
pub mod trail;
pub mod updates;
pub mod visibility;
