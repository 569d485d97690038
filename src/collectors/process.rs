//! Process level counters.

/// Gets the number of threads in the current process.
#[cfg(target_os = "linux")]
pub fn thread_count() -> Option<u64> {
    use std::fs;

    // Count entries in /proc/self/task/
    let entries = fs::read_dir("/proc/self/task").ok()?;
    Some(entries.count() as u64)
}

/// Gets the number of threads in the current process.
#[cfg(target_os = "macos")]
pub fn thread_count() -> Option<u64> {
    // Would require mach APIs
    None
}

/// Gets the number of threads in the current process.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn thread_count() -> Option<u64> {
    None
}
