//! Injected progress reporting.
//!
//! Long operations (export traversal, migration steps, import batches)
//! report progress through a caller-supplied reporter. Reporting is a side
//! channel only: reporter failures are impossible by construction (the
//! methods are infallible) and no engine reads anything back from it.

/// Receives progress notifications from long-running operations.
///
/// All methods have empty default bodies, so implementors override only
/// what they care about.
pub trait ProgressReporter {
    /// A new phase has started, with an expected number of work items.
    fn begin(&self, _phase: &str, _total: u64) {}

    /// `done` items of the current phase are complete.
    fn advance(&self, _phase: &str, _done: u64) {}

    /// The phase has finished.
    fn finish(&self, _phase: &str) {}
}

/// The default reporter: ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {}
