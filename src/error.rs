use thiserror::Error;

/// Failures that can occur inside a single sampler tick.
///
/// None of these ever reach the caller of [`start`](crate::start); the sampler drops the
/// affected tick and carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Runtime introspection failed or returned partial data.
    #[error("runtime snapshot unavailable: {0}")]
    SnapshotUnavailable(String),
    /// The metrics pipeline refused a sample.
    #[error("metrics pipeline rejected sample: {0}")]
    RecordRejected(String),
}
