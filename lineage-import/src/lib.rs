//! Import engine: merges an archive into a possibly non-empty target
//! store as one all-or-nothing transaction.
//!
//! All mutations are staged into a single write batch; the store's
//! `apply` is the transaction boundary, so a failure anywhere during
//! staging leaves the target untouched. Archives written at an older
//! schema version are upgraded into scratch space first.

mod engine;
mod error;
mod extras;

pub use engine::{import, ImportOptions};
pub use error::ImportError;
pub use extras::merge_extras;

pub use lineage_model::{ImportResult, SkippedLink};
