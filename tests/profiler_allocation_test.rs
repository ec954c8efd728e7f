//! Profiler measurements with the tracking allocator installed
//!
//! The allocator counters are process-wide, so assertions here only use
//! lower bounds that concurrent tests cannot invalidate.

use serde_json::json;
use specbench::profiler::{alloc, Operation, PerformanceProfiler, TrackingAllocator};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

const EIGHT_MB: usize = 8 * 1024 * 1024;

fn allocate_eight_mb() -> Operation {
    Operation::blocking("allocate", || {
        let buffer = vec![1u8; EIGHT_MB];
        Ok(json!(std::hint::black_box(buffer).len()))
    })
}

#[test]
fn test_allocator_reports_installed() {
    let data = vec![0u64; 1024];
    assert!(alloc::is_installed());
    assert!(alloc::current_bytes() >= data.len() * 8);
    assert!(alloc::peak_bytes() >= alloc::current_bytes() / 2);
}

#[tokio::test]
async fn test_peak_memory_tracks_allocation() {
    let profiler = PerformanceProfiler::new(4096, 30);
    let report = profiler.measure_performance(&allocate_eight_mb()).await;

    assert_eq!(report.successful_executions, 1);
    assert_eq!(report.result_data, Some(json!(EIGHT_MB)));
    assert!(report.peak_memory_mb >= 7.5, "peak was {}", report.peak_memory_mb);
}

#[tokio::test]
async fn test_peak_disabled_without_memory_profiling() {
    let profiler = PerformanceProfiler::new(4096, 30).with_memory_profiling(false);
    let report = profiler.measure_performance(&allocate_eight_mb()).await;

    assert_eq!(report.successful_executions, 1);
    assert!(report.peak_memory_mb.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_allocation_over_limit_fails() {
    let profiler = PerformanceProfiler::new(4, 30);
    let report = profiler.measure_performance(&allocate_eight_mb()).await;

    assert_eq!(report.failed_executions, 1);
    let message = report.details[0].error_message.as_deref().unwrap();
    assert!(message.contains("Memory limit exceeded"), "{message}");
    assert!(report.result_data.is_none());
}
