#![cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]

use std::time::Duration;

use runtime_sampler::collectors::{pause_recorder, ProcessRuntime};
use runtime_sampler::test::TestRecorder;
use runtime_sampler::views::PAUSE_NS_VIEW;
use runtime_sampler::{Sampler, SamplerConfig};
use tokio::time;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_process_wide_pauses_reach_the_sampler() {
    // recorded before the facility exists, as a host without access to it would
    pause_recorder().record(Duration::from_nanos(1_234_567));

    let recorder = TestRecorder::new();
    let cancel = CancellationToken::new();
    let handle = Sampler::new(ProcessRuntime::new(), recorder.clone())
        .with_config(SamplerConfig::new().with_interval(Duration::from_secs(1)))
        .start(&cancel);

    time::sleep(Duration::from_millis(1500)).await;
    handle.shutdown();
    handle.wait().await;

    assert_eq!(recorder.last_value(&PAUSE_NS_VIEW), Some(1_234_567));
}
