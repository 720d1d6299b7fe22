//! Export engine: computes the provenance closure of a set of seed
//! entities and writes it into an archive.
//!
//! Traversal and serialization are decoupled: [`compute_closure`] only
//! needs a query-capable store, and [`export`] feeds its result to the
//! archive writer.

mod error;
mod export;
mod traversal;

pub use error::{ExportError, ExportResult};
pub use export::{export, ExportOptions};
pub use traversal::{compute_closure, Closure};
