//! Configuration for the sampler.

use std::borrow::Cow;
use std::time::Duration;

/// Configuration for a [`Sampler`](crate::Sampler).
#[derive(Clone)]
pub struct SamplerConfig {
    /// How often to take and record a snapshot.
    ///
    /// Values below [`MIN_INTERVAL`](Self::MIN_INTERVAL) are raised to it.
    ///
    /// Default: 10 seconds
    pub interval: Duration,

    /// Name of the OS thread used when the sampler is started outside of a tokio runtime.
    ///
    /// Default: `runtime-sampler`
    pub thread_name: Cow<'static, str>,
}

impl SamplerConfig {
    /// The smallest interval the sampler runs at.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// The largest interval the sampler runs at. Longer intervals are shortened to one year.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sampling interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the name of the fallback sampler thread.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// The interval actually used, after clamping.
    pub fn effective_interval(&self) -> Duration {
        self.interval.clamp(Self::MIN_INTERVAL, Self::MAX_INTERVAL)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            thread_name: Cow::Borrowed("runtime-sampler"),
        }
    }
}

impl std::fmt::Debug for SamplerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerConfig")
            .field("interval", &self.interval)
            .field("effective_interval", &self.effective_interval())
            .field("thread_name", &self.thread_name)
            .finish()
    }
}
