//! Tokio scheduler counters.

use tokio::runtime::Handle;

/// Number of tasks currently alive on the runtime behind `handle`.
pub fn alive_tasks(handle: &Handle) -> u64 {
    handle.metrics().num_alive_tasks() as u64
}
