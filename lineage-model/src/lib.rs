//! Data model of the Lineage provenance archive.
//!
//! The archive's entity records are a closed set of tagged variants,
//! validated on read: unknown fields are rejected rather than silently
//! dropped. Merge behavior during import is expressed as explicit policy
//! records; the legacy string-encoded forms are accepted only at the
//! boundary, with upfront validation.

mod entity;
mod error;
mod link;
mod metadata;
mod policy;
mod result;
mod rules;

pub use entity::{
    CodeRecord, CommentRecord, ComputerRecord, Entity, GroupRecord, LogRecord, NodeRecord,
    UserRecord,
};
pub use error::ModelError;
pub use link::Link;
pub use metadata::ArchiveMetadata;
pub use policy::{
    AddNew, CommentMergeMode, ExtrasMergePolicy, ExtrasModeNew, OnCollision, RetainUnmatched,
};
pub use result::{ImportResult, SkippedLink};
pub use rules::TraversalRules;
