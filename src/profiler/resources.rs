//! Process resource probes
//!
//! Linux-specific data (resident set size) degrades to 0 on other platforms;
//! CPU time comes from `getrusage` on every unix.

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Convert a byte count to megabytes.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Resident set size of this process in megabytes (Linux only).
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn current_rss_mb() -> f64 {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("VmRSS:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .and_then(|kb| kb.parse::<u64>().ok())
            })
            .map_or(0.0, |kb| kb as f64 / 1024.0)
    }
    #[cfg(not(target_os = "linux"))]
    {
        0.0
    }
}

/// User plus system CPU time consumed by this process, in milliseconds.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn process_cpu_time_ms() -> f64 {
    #[cfg(unix)]
    {
        use nix::sys::resource::{getrusage, UsageWho};
        use nix::sys::time::TimeVal;

        let to_ms = |tv: TimeVal| tv.tv_sec() as f64 * 1_000.0 + tv.tv_usec() as f64 / 1_000.0;
        getrusage(UsageWho::RUSAGE_SELF)
            .map_or(0.0, |usage| to_ms(usage.user_time()) + to_ms(usage.system_time()))
    }
    #[cfg(not(unix))]
    {
        0.0
    }
}
