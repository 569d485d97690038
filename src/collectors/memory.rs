//! Memory counters of the current process.

/// Heap usage as seen by the allocator or the operating system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Live bytes in use.
    pub in_use: u64,
    /// Bytes obtained from the operating system.
    pub from_os: u64,
}

/// Reads memory usage, preferring allocator statistics when jemalloc is compiled in.
///
/// Without jemalloc the figures come from the operating system and are coarser than live heap:
///
/// - Linux: resident set size as `in_use`, virtual size as `from_os`.
/// - macOS: both fields hold the *peak* resident set size (`ru_maxrss`). The value never
///   decreases, so it does not reflect memory released since the peak.
/// - Windows: working set as `in_use`, committed private bytes as `from_os`.
pub fn memory_usage() -> Option<MemoryUsage> {
    #[cfg(all(feature = "jemalloc", unix))]
    {
        if let Some(usage) = jemalloc_usage() {
            return Some(usage);
        }
    }

    os_usage()
}

/// Reads resident and virtual size from `/proc/self/statm`.
#[cfg(target_os = "linux")]
fn os_usage() -> Option<MemoryUsage> {
    use std::fs;

    // Format: size resident shared text lib data dt
    // Values are in pages
    let statm = fs::read_to_string("/proc/self/statm").ok()?;
    parse_statm(&statm, page_size()?)
}

#[cfg(target_os = "linux")]
fn page_size() -> Option<u64> {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    u64::try_from(size).ok().filter(|&size| size > 0)
}

#[cfg(any(target_os = "linux", test))]
fn parse_statm(statm: &str, page_size: u64) -> Option<MemoryUsage> {
    let mut parts = statm.split_whitespace();
    let size_pages: u64 = parts.next()?.parse().ok()?;
    let resident_pages: u64 = parts.next()?.parse().ok()?;

    Some(MemoryUsage {
        in_use: resident_pages.saturating_mul(page_size),
        from_os: size_pages.saturating_mul(page_size),
    })
}

/// Reads the peak resident size, which is the only figure `getrusage` offers.
///
/// This is a high-water mark, not current heap usage, and is reported for both fields.
#[cfg(target_os = "macos")]
fn os_usage() -> Option<MemoryUsage> {
    use std::mem;

    unsafe {
        let mut info: libc::rusage = mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut info) == 0 {
            // On macOS, ru_maxrss is in bytes
            let rss = u64::try_from(info.ru_maxrss).ok()?;
            Some(MemoryUsage {
                in_use: rss,
                from_os: rss,
            })
        } else {
            None
        }
    }
}

/// Reads the working set and committed private bytes.
#[cfg(target_os = "windows")]
fn os_usage() -> Option<MemoryUsage> {
    use windows_sys::Win32::System::ProcessStatus::{
        GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS,
    };
    use windows_sys::Win32::System::Threading::GetCurrentProcess;

    unsafe {
        let process = GetCurrentProcess();
        let mut pmc: PROCESS_MEMORY_COUNTERS = std::mem::zeroed();
        pmc.cb = std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32;

        if GetProcessMemoryInfo(
            process,
            &mut pmc,
            std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32,
        ) != 0
        {
            Some(MemoryUsage {
                in_use: pmc.WorkingSetSize as u64,
                from_os: pmc.PagefileUsage as u64,
            })
        } else {
            None
        }
    }
}

/// Fallback for unsupported platforms.
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn os_usage() -> Option<MemoryUsage> {
    None
}

/// Reads allocated and mapped bytes from jemalloc.
#[cfg(all(feature = "jemalloc", unix))]
fn jemalloc_usage() -> Option<MemoryUsage> {
    use tikv_jemalloc_ctl::{epoch, stats};

    // Advance the epoch to get fresh stats
    epoch::advance().ok()?;

    let allocated = stats::allocated::read().ok()?;
    let mapped = stats::mapped::read().ok()?;

    Some(MemoryUsage {
        in_use: allocated as u64,
        from_os: mapped as u64,
    })
}
