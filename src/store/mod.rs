//! The global predicate table: the external collaborator spec.md §1 says
//! the core only needs through a narrow seam (a clause handle, plus a way
//! to mint a clause's next local generation and to retract it in the
//! global timeline). Clause compilation, indexing, and the clause
//! reference lifecycle proper belong to the surrounding runtime and are
//! out of scope; what's here is the minimal in-memory backing needed to
//! exercise and test the transaction engine, in the spirit of the donor
//! crate's `storage::engine::Engine` + `storage::memory::Memory` pair.

pub mod memory;

pub use memory::ClauseStore;

use serde_derive::{Deserialize, Serialize};

use crate::generation::Gen;

/// Status of the clause store, in the spirit of the donor's
/// `storage::Status` / `mvcc::Status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// The current global generation `G`.
    pub generation: Gen,
    /// Total number of predicates known to the store.
    pub predicates: u64,
    /// Total number of clause handles ever created (live or erased).
    pub clauses: u64,
}
