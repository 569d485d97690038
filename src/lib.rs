//! Periodic runtime telemetry sampler.
//!
//! This crate samples the hosting process at a fixed cadence and publishes four gauges into a
//! metrics pipeline:
//!
//! - `process/cpu_goroutines`: tasks alive on the async runtime
//! - `process/heap_alloc`: live heap bytes
//! - `process/sys_heap`: bytes obtained from the operating system
//! - `process/pause_ns`: the most recent stop-the-world pause
//!
//! Every sample is a point-in-time value. Rates, histograms and other derived figures are left
//! to the pipeline.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let sampler = runtime_sampler::start(&cancel, Duration::from_secs(10));
//!
//! // on shutdown
//! sampler.shutdown();
//! ```
//!
//! Samples go to the global [`metrics`] recorder. To sample into something else, or to observe a
//! different runtime, build a [`Sampler`] from your own [`RuntimeStats`] and [`Recorder`].
//!
//! # Features
//!
//! - `jemalloc`: read heap figures from jemalloc instead of the operating system.
//! - `test`: activates the [`test`] module with fakes for both seams.

#![doc(html_favicon_url = "https://sentry-brand.storage.googleapis.com/favicon.ico")]
#![doc(html_logo_url = "https://sentry-brand.storage.googleapis.com/sentry-glyph-black.png")]
#![warn(missing_docs)]

mod collector;
mod config;
mod error;
mod recorder;
mod sampler;
mod snapshot;
mod units;

pub mod collectors;
pub mod views;


pub use collector::RuntimeStats;
pub use config::SamplerConfig;
pub use error::Error;
pub use recorder::{Measurement, MetricsRecorder, RecordContext, Recorder};
pub use sampler::{start, Sample, Sampler, SamplerState, ShutdownHandle};
pub use snapshot::{PauseRing, RuntimeSnapshot, PAUSE_RING_CAPACITY};
pub use units::{MetricUnit, ParseMetricUnitError};
