//! Core type definitions for the Lineage provenance archive.
//!
//! Everything here is plain data shared by every other crate in the
//! workspace: identifier newtypes, the fixed link-type and entity-kind
//! enumerations, and the injected progress-reporter trait.

mod ids;
mod kinds;
mod progress;

pub use ids::EntityId;
pub use kinds::{EntityKind, LinkEnd, LinkType};
pub use progress::{NoopProgress, ProgressReporter};
