//! The runtime introspection seam.

use std::sync::Arc;

use crate::{Error, RuntimeSnapshot};

/// Source of runtime snapshots.
///
/// The sampler calls [`snapshot`](RuntimeStats::snapshot) once per tick. Production code uses
/// [`ProcessRuntime`](crate::collectors::ProcessRuntime); tests substitute a fake.
///
/// # Example
///
/// ```rust
/// use runtime_sampler::{Error, RuntimeSnapshot, RuntimeStats};
///
/// struct FixedStats;
///
/// impl RuntimeStats for FixedStats {
///     fn snapshot(&self) -> Result<RuntimeSnapshot, Error> {
///         Ok(RuntimeSnapshot {
///             tasks: 3,
///             ..Default::default()
///         })
///     }
/// }
/// ```
pub trait RuntimeStats: Send + Sync + 'static {
    /// Reads the current counters.
    ///
    /// This may briefly stall other work but should return promptly; the sampler imposes no
    /// timeout.
    fn snapshot(&self) -> Result<RuntimeSnapshot, Error>;
}

impl<T: RuntimeStats + ?Sized> RuntimeStats for Arc<T> {
    fn snapshot(&self) -> Result<RuntimeSnapshot, Error> {
        (**self).snapshot()
    }
}
