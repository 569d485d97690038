//! The production runtime introspection facility.
//!
//! [`ProcessRuntime`] combines:
//! - the tokio scheduler's alive task count, or the OS thread count when no runtime is attached
//! - allocator statistics (with the `jemalloc` feature) or the process memory reported by the OS
//! - a pause history the host feeds through a [`PauseRecorder`]
//!
//! Every `ProcessRuntime` reads the process-wide history returned by [`pause_recorder`] unless
//! it was given its own with [`ProcessRuntime::with_pause_recorder`].

mod memory;
mod process;
mod tokio_runtime;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use lazy_static::lazy_static;

use crate::snapshot::{PauseRing, RuntimeSnapshot};
use crate::{Error, RuntimeStats};

pub use memory::{memory_usage, MemoryUsage};
pub use process::thread_count;
pub use tokio_runtime::alive_tasks;

lazy_static! {
    static ref PROCESS_PAUSES: PauseRecorder = PauseRecorder::new();
}

/// Returns the process-wide pause history.
///
/// Pauses recorded here show up in every [`ProcessRuntime`] that was not given its own history,
/// including the one [`start`](crate::start) creates.
pub fn pause_recorder() -> PauseRecorder {
    PROCESS_PAUSES.clone()
}

/// Reads snapshots of the current process.
#[derive(Clone, Debug)]
pub struct ProcessRuntime {
    handle: Option<tokio::runtime::Handle>,
    pauses: PauseRecorder,
}

impl ProcessRuntime {
    /// Creates a facility observing the tokio runtime this is called from, if any.
    pub fn new() -> Self {
        Self {
            handle: tokio::runtime::Handle::try_current().ok(),
            pauses: pause_recorder(),
        }
    }

    /// Creates a facility observing the runtime behind the given handle.
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Some(handle),
            pauses: pause_recorder(),
        }
    }

    /// Reads pauses from `pauses` instead of the process-wide history.
    #[must_use]
    pub fn with_pause_recorder(mut self, pauses: PauseRecorder) -> Self {
        self.pauses = pauses;
        self
    }

    /// Returns a handle for reporting pauses into the history this facility reads.
    pub fn pause_recorder(&self) -> PauseRecorder {
        self.pauses.clone()
    }

    fn tasks(&self) -> Option<u64> {
        match self.handle {
            Some(ref handle) => Some(alive_tasks(handle)),
            None => thread_count(),
        }
    }
}

impl Default for ProcessRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeStats for ProcessRuntime {
    fn snapshot(&self) -> Result<RuntimeSnapshot, Error> {
        let tasks = self
            .tasks()
            .ok_or_else(|| Error::SnapshotUnavailable("task count not supported".into()))?;
        let memory = memory_usage()
            .ok_or_else(|| Error::SnapshotUnavailable("memory usage not supported".into()))?;

        Ok(RuntimeSnapshot {
            tasks,
            heap_alloc: memory.in_use,
            heap_sys: memory.from_os,
            pauses: self.pauses.ring(),
        })
    }
}

/// Shared history of stop-the-world pauses.
///
/// Rust has no collector of its own, so pauses come from the host: compaction passes, cache
/// sweeps or anything else that halts request processing. Each call to
/// [`record`](PauseRecorder::record) completes one cycle.
#[derive(Clone, Debug, Default)]
pub struct PauseRecorder {
    ring: Arc<Mutex<PauseRing>>,
}

impl PauseRecorder {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the duration of a completed pause.
    pub fn record(&self, pause: Duration) {
        self.ring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(pause);
    }

    /// Runs `f` and records its duration as a pause.
    pub fn measure<R>(&self, f: impl FnOnce() -> R) -> R {
        let start = std::time::Instant::now();
        let rv = f();
        self.record(start.elapsed());
        rv
    }

    fn ring(&self) -> PauseRing {
        self.ring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_without_runtime() {
        let runtime = ProcessRuntime::new().with_pause_recorder(PauseRecorder::new());
        let snapshot = runtime.snapshot();

        #[cfg(target_os = "linux")]
        {
            let snapshot = snapshot.unwrap();
            assert!(snapshot.tasks >= 1);
            assert!(snapshot.heap_alloc > 0);
            assert_eq!(snapshot.num_gc(), 0);
            assert_eq!(snapshot.last_pause_ns(), 0);
        }
        #[cfg(not(target_os = "linux"))]
        let _ = snapshot;
    }

    #[tokio::test]
    async fn test_snapshot_counts_tasks() {
        let runtime = ProcessRuntime::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = rx.await;
        });

        if let Ok(snapshot) = runtime.snapshot() {
            assert!(snapshot.tasks >= 1);
        }

        tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[test]
    fn test_recorded_pauses_show_up() {
        let runtime = ProcessRuntime::new().with_pause_recorder(PauseRecorder::new());
        let pauses = runtime.pause_recorder();
        pauses.record(Duration::from_millis(3));
        pauses.record(Duration::from_nanos(1_234_567));

        if let Ok(snapshot) = runtime.snapshot() {
            assert_eq!(snapshot.num_gc(), 2);
            assert_eq!(snapshot.last_pause_ns(), 1_234_567);
        }
    }

    #[test]
    fn test_new_facilities_share_the_process_history() {
        let first = ProcessRuntime::new();
        let second = ProcessRuntime::new();
        let before = pause_recorder().ring().cycles();

        first.pause_recorder().record(Duration::from_micros(5));

        assert!(second.pauses.ring().cycles() > before);
        assert!(Arc::ptr_eq(&first.pauses.ring, &second.pauses.ring));
        assert!(Arc::ptr_eq(&second.pauses.ring, &pause_recorder().ring));
    }

    #[test]
    fn test_own_history_is_isolated() {
        let shared = ProcessRuntime::new();
        let isolated = ProcessRuntime::new().with_pause_recorder(PauseRecorder::new());

        isolated.pause_recorder().record(Duration::from_micros(5));

        assert_eq!(isolated.pauses.ring().cycles(), 1);
        assert!(!Arc::ptr_eq(&shared.pauses.ring, &isolated.pauses.ring));
    }

    #[test]
    fn test_measure_records_a_cycle() {
        let pauses = PauseRecorder::new();
        let value = pauses.measure(|| 42);
        assert_eq!(value, 42);
        assert_eq!(pauses.ring().cycles(), 1);
    }
}
