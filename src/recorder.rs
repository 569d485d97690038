//! The metrics pipeline seam.

use std::sync::Arc;
use std::time::SystemTime;

use crate::views::{View, ALL_VIEWS};
use crate::Error;

/// The context a tick's samples are recorded under.
///
/// Every tick creates a fresh context. It carries no link to the cancellation token the sampler
/// was started with, so recording is never suppressed by the caller tearing down its own work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordContext {
    /// Wall clock time of the tick.
    pub timestamp: SystemTime,
    /// Monotonic time of the tick.
    pub instant: tokio::time::Instant,
}

impl RecordContext {
    /// Creates a context stamped with the current time.
    pub fn new() -> Self {
        Self {
            timestamp: SystemTime::now(),
            instant: tokio::time::Instant::now(),
        }
    }
}

impl Default for RecordContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One value for one view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Measurement {
    /// The view the value belongs to.
    pub view: &'static View,
    /// The sampled value.
    pub value: i64,
}

impl Measurement {
    /// Creates a new measurement.
    pub fn new(view: &'static View, value: i64) -> Self {
        Self { view, value }
    }
}

/// Sink for recorded samples.
///
/// All measurements passed to one [`record`](Recorder::record) call originate from the same
/// snapshot. Keeping the last value per view is the implementation's job.
pub trait Recorder: Send + Sync + 'static {
    /// Registers the views with the pipeline.
    ///
    /// Hosts call this once before starting a sampler. Registering twice is either a no-op or an
    /// error of the pipeline.
    fn register(&self, views: &[&'static View]) -> Result<(), Error> {
        let _ = views;
        Ok(())
    }

    /// Records the measurements of one tick.
    fn record(&self, context: &RecordContext, measurements: &[Measurement]) -> Result<(), Error>;
}

impl<T: Recorder + ?Sized> Recorder for Arc<T> {
    fn register(&self, views: &[&'static View]) -> Result<(), Error> {
        (**self).register(views)
    }

    fn record(&self, context: &RecordContext, measurements: &[Measurement]) -> Result<(), Error> {
        (**self).record(context, measurements)
    }
}

/// Records samples as gauges through the [`metrics`] facade.
///
/// Values go to whatever recorder is installed globally with `metrics::set_global_recorder`. If
/// none is installed the samples are discarded by the facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsRecorder {
    _private: (),
}

impl MetricsRecorder {
    /// Creates a new recorder bound to the global [`metrics`] recorder.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Registers all published views.
    pub fn register_all(&self) {
        describe(&ALL_VIEWS);
    }
}

fn describe(views: &[&'static View]) {
    for view in views {
        metrics::describe_gauge!(view.name, view.unit().to_metrics_unit(), view.description);
    }
}

impl Recorder for MetricsRecorder {
    fn register(&self, views: &[&'static View]) -> Result<(), Error> {
        describe(views);
        Ok(())
    }

    fn record(&self, _context: &RecordContext, measurements: &[Measurement]) -> Result<(), Error> {
        for measurement in measurements {
            metrics::gauge!(measurement.view.name).set(measurement.value as f64);
        }
        Ok(())
    }
}
