//! Store collaborators of the Lineage archive engines.
//!
//! The entity store and the blob store are external systems from the
//! archive core's point of view: the engines reach them only through the
//! traits in this crate. The in-memory implementations are the reference
//! semantics (and the test harness) for those traits.
//!
//! Writes go through [`WriteStore::apply`] with a fully staged
//! [`WriteBatch`]: the batch commits entirely or not at all, which is the
//! coarse transaction the import engine builds its all-or-nothing
//! guarantee on.

mod error;
mod memory;
mod repository;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use repository::{MemoryRepository, RepositorySink, RepositorySource};
pub use traits::{EntityFilter, QueryStore, WriteBatch, WriteOp, WriteStore};
