//! Example demonstrating the runtime sampler.
//!
//! Samples the demo process every second for a few seconds and prints every recorded tick.
//! Run with `RUST_LOG=debug` to see the sampler's lifecycle logs.

use std::time::Duration;

use runtime_sampler::collectors::{pause_recorder, ProcessRuntime};
use runtime_sampler::views::ALL_VIEWS;
use runtime_sampler::{Error, Measurement, RecordContext, Recorder, Sampler, SamplerConfig};
use tokio_util::sync::CancellationToken;

/// Prints samples instead of exporting them.
struct StdoutRecorder;

impl Recorder for StdoutRecorder {
    fn register(&self, views: &[&'static runtime_sampler::views::View]) -> Result<(), Error> {
        for view in views {
            println!("  registered {:<28} {}", view.name, view.description);
        }
        Ok(())
    }

    fn record(&self, context: &RecordContext, measurements: &[Measurement]) -> Result<(), Error> {
        println!("tick at {:?}", context.timestamp);
        for m in measurements {
            println!("  {:<28} = {} {}", m.view.name, m.value, m.view.unit());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    println!("Runtime Sampler Demo");
    println!("====================\n");

    let recorder = StdoutRecorder;
    recorder.register(&ALL_VIEWS).ok();

    let runtime = ProcessRuntime::new();
    let pauses = pause_recorder();

    // a few busy tasks so the task count has something to show
    let cancel = CancellationToken::new();
    for _ in 0..8 {
        let cancel = cancel.clone();
        tokio::spawn(async move { cancel.cancelled().await });
    }

    let sampler = Sampler::new(runtime, recorder)
        .with_config(SamplerConfig::new().with_interval(Duration::from_secs(1)))
        .start(&cancel);

    // pretend the application stopped the world for a moment
    pauses.measure(|| std::thread::sleep(Duration::from_millis(3)));

    tokio::time::sleep(Duration::from_millis(3500)).await;

    cancel.cancel();
    sampler.wait().await;
    println!("\nsampler stopped");
}
