//! The sampling loop and its shutdown handle.

use std::sync::Once;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::collectors::ProcessRuntime;
use crate::config::SamplerConfig;
use crate::recorder::{Measurement, MetricsRecorder, RecordContext, Recorder};
use crate::snapshot::RuntimeSnapshot;
use crate::views::{HEAP_ALLOC_VIEW, HEAP_SYSTEM_VIEW, PAUSE_NS_VIEW, TASK_COUNT_VIEW};
use crate::{Error, RuntimeStats};

/// Starts sampling the current process into the global [`metrics`] recorder.
///
/// The four views are registered on the first call. Sampling happens every `cadence`, but no
/// more often than once per second and no less often than once per year, and the first sample
/// is taken one cadence after this returns. It stops when `cancel` fires or when [`ShutdownHandle::shutdown`] is called.
///
/// Must be called from within a tokio runtime to observe that runtime's tasks. Outside of one,
/// a dedicated thread is used and the OS thread count stands in for the task count.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() {
/// let cancel = CancellationToken::new();
/// let sampler = runtime_sampler::start(&cancel, Duration::from_secs(10));
/// // ...
/// sampler.shutdown();
/// sampler.wait().await;
/// # }
/// ```
pub fn start(cancel: &CancellationToken, cadence: Duration) -> ShutdownHandle {
    static REGISTER: Once = Once::new();

    let recorder = MetricsRecorder::new();
    REGISTER.call_once(|| recorder.register_all());

    Sampler::new(ProcessRuntime::new(), recorder)
        .with_config(SamplerConfig::new().with_interval(cadence))
        .start(cancel)
}

/// The four values derived from one snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sample {
    /// Tasks alive on the scheduler.
    pub tasks: i64,
    /// Live heap bytes.
    pub heap_alloc: i64,
    /// Bytes obtained from the OS.
    pub heap_sys: i64,
    /// Most recent pause in nanoseconds.
    pub pause_ns: i64,
}

impl Sample {
    /// Derives the sample from a snapshot. Values above `i64::MAX` saturate.
    pub fn from_snapshot(snapshot: &RuntimeSnapshot) -> Self {
        Self {
            tasks: saturate(snapshot.tasks),
            heap_alloc: saturate(snapshot.heap_alloc),
            heap_sys: saturate(snapshot.heap_sys),
            pause_ns: saturate(snapshot.last_pause_ns()),
        }
    }

    /// The sample as one measurement per view.
    pub fn measurements(&self) -> [Measurement; 4] {
        [
            Measurement::new(&TASK_COUNT_VIEW, self.tasks),
            Measurement::new(&HEAP_ALLOC_VIEW, self.heap_alloc),
            Measurement::new(&HEAP_SYSTEM_VIEW, self.heap_sys),
            Measurement::new(&PAUSE_NS_VIEW, self.pause_ns),
        ]
    }
}

fn saturate(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Periodically snapshots a [`RuntimeStats`] and records the result into a [`Recorder`].
pub struct Sampler<S, R> {
    stats: S,
    recorder: R,
    config: SamplerConfig,
}

impl<S: RuntimeStats, R: Recorder> Sampler<S, R> {
    /// Creates a sampler with the default configuration.
    pub fn new(stats: S, recorder: R) -> Self {
        Self {
            stats,
            recorder,
            config: SamplerConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    /// The current configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Takes one snapshot and records it.
    ///
    /// This is the body of every tick. Nothing is recorded if the snapshot fails.
    pub fn sample_once(&self) -> Result<Sample, Error> {
        let snapshot = self.stats.snapshot()?;
        let sample = Sample::from_snapshot(&snapshot);
        self.recorder
            .record(&RecordContext::new(), &sample.measurements())?;
        Ok(sample)
    }

    /// Launches the sampling loop and returns immediately.
    ///
    /// The loop observes a child of `cancel`, so calling [`ShutdownHandle::shutdown`] never
    /// cancels the caller's token.
    pub fn start(self, cancel: &CancellationToken) -> ShutdownHandle {
        let cancel = cancel.child_token();
        let stopped = CancellationToken::new();
        let handle = ShutdownHandle {
            cancel: cancel.clone(),
            stopped: stopped.clone(),
        };
        let guard = stopped.drop_guard();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(self.run(cancel, guard));
            }
            Err(_) => self.spawn_thread(cancel, guard),
        }

        handle
    }

    fn spawn_thread(self, cancel: CancellationToken, guard: DropGuard) {
        let name = self.config.thread_name.to_string();
        let spawned = std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        warn!("runtime sampler could not build its runtime: {}", err);
                        return;
                    }
                };
                runtime.block_on(self.run(cancel, guard));
            });

        // the guard went down with the closure, so the handle already reads as stopped
        if let Err(err) = spawned {
            warn!("runtime sampler thread could not be spawned: {}", err);
        }
    }

    async fn run(self, cancel: CancellationToken, _stopped: DropGuard) {
        let period = self.config.effective_interval();
        // period is capped at MAX_INTERVAL, so this cannot overflow
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("runtime sampler started, sampling every {:?}", period);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.sample_once() {
                Ok(sample) => trace!("recorded runtime sample {:?}", sample),
                Err(err) => debug!("dropped runtime sample: {}", err),
            }
        }

        drop(ticker);
        debug!("runtime sampler stopped");
    }
}

impl<S, R> std::fmt::Debug for Sampler<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("config", &self.config)
            .finish()
    }
}

/// Lifecycle state of a started sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerState {
    /// The loop is ticking. A requested shutdown takes effect at the next wait point.
    Running,
    /// The loop has returned. This state is terminal.
    Stopped,
}

/// Requests shutdown of a started sampler.
///
/// Dropping the handle does not stop the sampler; it keeps running until the token it was
/// started with fires.
#[derive(Clone, Debug)]
#[must_use = "dropping the handle leaves no way to stop the sampler other than its parent token"]
pub struct ShutdownHandle {
    cancel: CancellationToken,
    stopped: CancellationToken,
}

impl ShutdownHandle {
    /// Asks the sampler to stop. Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once the sampling loop has returned.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SamplerState {
        if self.is_stopped() {
            SamplerState::Stopped
        } else {
            SamplerState::Running
        }
    }

    /// Waits until the sampling loop has returned.
    pub async fn wait(&self) {
        self.stopped.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{PauseRing, PAUSE_RING_CAPACITY};
    use crate::test::{FakeRuntime, TestRecorder};

    #[test]
    fn test_sample_once_pass_through() {
        let recorder = TestRecorder::new();
        let sampler = Sampler::new(
            FakeRuntime::fixed(RuntimeSnapshot {
                tasks: 42,
                heap_alloc: 1 << 20,
                heap_sys: 4 << 20,
                pauses: PauseRing::new(),
            }),
            recorder.clone(),
        );

        sampler.sample_once().unwrap();

        let ticks = recorder.ticks();
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].value(&TASK_COUNT_VIEW), Some(42));
        assert_eq!(ticks[0].value(&HEAP_ALLOC_VIEW), Some(1_048_576));
        assert_eq!(ticks[0].value(&HEAP_SYSTEM_VIEW), Some(4_194_304));
        assert_eq!(ticks[0].value(&PAUSE_NS_VIEW), Some(0));
    }

    #[test]
    fn test_sample_once_reads_most_recent_pause() {
        let mut slots = [0; PAUSE_RING_CAPACITY];
        slots[4] = 1_234_567;
        let recorder = TestRecorder::new();
        let sampler = Sampler::new(
            FakeRuntime::fixed(RuntimeSnapshot {
                pauses: PauseRing::from_parts(slots, 5),
                ..Default::default()
            }),
            recorder.clone(),
        );

        let sample = sampler.sample_once().unwrap();

        assert_eq!(sample.pause_ns, 1_234_567);
        assert_eq!(recorder.last_value(&PAUSE_NS_VIEW), Some(1_234_567));
    }

    #[test]
    fn test_snapshot_failure_records_nothing() {
        let recorder = TestRecorder::new();
        let sampler = Sampler::new(FakeRuntime::failing_on(&[1]), recorder.clone());

        let err = sampler.sample_once().unwrap_err();

        assert!(matches!(err, Error::SnapshotUnavailable(_)));
        assert_eq!(recorder.attempts(), 0);
    }

    #[test]
    fn test_rejected_record_is_reported() {
        let sampler = Sampler::new(
            FakeRuntime::fixed(RuntimeSnapshot::default()),
            TestRecorder::rejecting(),
        );

        let err = sampler.sample_once().unwrap_err();
        assert!(matches!(err, Error::RecordRejected(_)));
    }

    #[test]
    fn test_values_saturate() {
        let sample = Sample::from_snapshot(&RuntimeSnapshot {
            heap_sys: u64::MAX,
            ..Default::default()
        });
        assert_eq!(sample.heap_sys, i64::MAX);
    }

    #[test]
    fn test_measurement_order() {
        let names: Vec<_> = Sample::default()
            .measurements()
            .iter()
            .map(|m| m.view.name)
            .collect();
        assert_eq!(names, crate::views::ALL_VIEWS.map(|v| v.name));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_do_not_stop_the_loop() {
        let recorder = TestRecorder::rejecting();
        let cancel = CancellationToken::new();
        let handle = Sampler::new(FakeRuntime::fixed(RuntimeSnapshot::default()), recorder.clone())
            .with_config(SamplerConfig::new().with_interval(Duration::from_secs(1)))
            .start(&cancel);

        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(recorder.attempts(), 3);

        recorder.set_rejecting(false);
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(recorder.ticks().len(), 1);

        handle.shutdown();
        handle.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_leaves_parent_token_alone() {
        let cancel = CancellationToken::new();
        let handle = Sampler::new(FakeRuntime::fixed(RuntimeSnapshot::default()), TestRecorder::new())
            .start(&cancel);

        assert_eq!(handle.state(), SamplerState::Running);
        handle.shutdown();
        handle.wait().await;

        assert_eq!(handle.state(), SamplerState::Stopped);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_stops_sampler() {
        let cancel = CancellationToken::new();
        let handle = Sampler::new(FakeRuntime::fixed(RuntimeSnapshot::default()), TestRecorder::new())
            .start(&cancel);

        cancel.cancel();
        time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .expect("sampler should stop");
        assert!(handle.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_cadence_keeps_running() {
        let recorder = TestRecorder::new();
        let cancel = CancellationToken::new();
        let handle = Sampler::new(FakeRuntime::fixed(RuntimeSnapshot::default()), recorder.clone())
            .with_config(SamplerConfig::new().with_interval(Duration::MAX))
            .start(&cancel);

        time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(handle.state(), SamplerState::Running);
        assert_eq!(recorder.attempts(), 0);

        handle.shutdown();
        time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .expect("sampler should stop");
    }

    #[test]
    fn test_start_outside_runtime_uses_thread() {
        let cancel = CancellationToken::new();
        let recorder = TestRecorder::new();
        let handle = Sampler::new(FakeRuntime::fixed(RuntimeSnapshot::default()), recorder.clone())
            .with_config(SamplerConfig::new().with_thread_name("sampler-under-test"))
            .start(&cancel);

        handle.shutdown();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            time::timeout(Duration::from_secs(5), handle.wait())
                .await
                .expect("sampler thread should stop");
        });
        assert_eq!(recorder.attempts(), 0);
    }
}
