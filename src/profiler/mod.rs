//! Performance profiler: timing, CPU and memory measurement under limits
//!
//! ## Limits
//!
//! Async operations run under a cancellable `tokio::time::timeout`, so a
//! deadline overrun stops them. Blocking operations cannot be interrupted;
//! their elapsed time and memory are checked after they return and a breach
//! turns the measurement into a failure.
//!
//! ## Example
//!
//! ```rust
//! use specbench::profiler::{Operation, PerformanceProfiler};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> specbench::Result<()> {
//! let profiler = PerformanceProfiler::new(512, 5);
//! let op = Operation::blocking("sum", || Ok(json!((0..1000u64).sum::<u64>())));
//!
//! let report = profiler.measure_multiple_executions(&op, 3).await?;
//! assert_eq!(report.successful_executions, 3);
//! # Ok(())
//! # }
//! ```

pub mod alloc;
mod operations;
pub mod resources;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::experiment::{PerformanceDetail, PerformanceReport};
use crate::{Error, Result};

pub use alloc::TrackingAllocator;
pub use operations::PredefinedOperation;

/// Boxed future returned by async operations.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

type BlockingFn = dyn Fn() -> anyhow::Result<Value> + Send + Sync;
type AsyncFn = dyn Fn() -> BoxFuture<anyhow::Result<Value>> + Send + Sync;

#[derive(Clone)]
enum OperationKind {
    Blocking(Arc<BlockingFn>),
    Async(Arc<AsyncFn>),
}

/// A named, repeatable target for the profiler.
#[derive(Clone)]
pub struct Operation {
    name: String,
    kind: OperationKind,
}

impl Operation {
    /// Wrap a synchronous closure.
    pub fn blocking<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: OperationKind::Blocking(Arc::new(f)),
        }
    }

    /// Wrap a closure producing a future.
    pub fn from_async<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let boxed = move || -> BoxFuture<anyhow::Result<Value>> { Box::pin(f()) };
        Self {
            name: name.into(),
            kind: OperationKind::Async(Arc::new(boxed)),
        }
    }

    /// Operation name, recorded as `function_name`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the operation is awaited rather than called.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self.kind, OperationKind::Async(_))
    }

    async fn invoke(&self) -> anyhow::Result<Value> {
        match &self.kind {
            OperationKind::Blocking(f) => f(),
            OperationKind::Async(f) => f().await,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("async", &self.is_async())
            .finish()
    }
}

/// Measures operations against a wall-time and memory budget.
#[derive(Debug, Clone)]
pub struct PerformanceProfiler {
    memory_limit_mb: f64,
    timeout: Duration,
    memory_profiling: bool,
}

impl Default for PerformanceProfiler {
    fn default() -> Self {
        Self::new(
            crate::experiment::DEFAULT_MEMORY_LIMIT_MB,
            crate::experiment::DEFAULT_TIMEOUT_SECONDS,
        )
    }
}

impl PerformanceProfiler {
    /// Create a profiler with the given limits.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(memory_limit_mb: u64, timeout_seconds: u64) -> Self {
        Self {
            memory_limit_mb: memory_limit_mb as f64,
            timeout: Duration::from_secs(timeout_seconds),
            memory_profiling: true,
        }
    }

    /// Override the timeout with sub-second precision.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable peak-memory tracking; when off, peaks are reported as 0.
    #[must_use]
    pub const fn with_memory_profiling(mut self, enabled: bool) -> Self {
        self.memory_profiling = enabled;
        self
    }

    /// Memory ceiling in megabytes.
    #[must_use]
    pub const fn memory_limit_mb(&self) -> f64 {
        self.memory_limit_mb
    }

    /// Wall-time ceiling.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Measure one execution.
    ///
    /// Never fails: errors of the operation and limit breaches produce a
    /// failed detail with the partial timing.
    pub async fn measure_performance(&self, operation: &Operation) -> PerformanceReport {
        let (detail, result_data) = self.measure_once(operation).await;
        let success = detail.success;
        PerformanceReport {
            total_executions: 1,
            successful_executions: usize::from(success),
            failed_executions: usize::from(!success),
            average_wall_time_ms: detail.wall_time_ms,
            average_cpu_time_ms: detail.cpu_time_ms,
            average_memory_mb: detail.memory_used_mb,
            peak_memory_mb: detail.peak_memory_mb,
            details: vec![detail],
            result_data,
        }
    }

    /// Measure `iterations` executions and average over the successful ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profiling`] if `iterations` is 0.
    #[allow(clippy::cast_precision_loss)]
    pub async fn measure_multiple_executions(
        &self,
        operation: &Operation,
        iterations: usize,
    ) -> Result<PerformanceReport> {
        if iterations < 1 {
            return Err(Error::Profiling("At least 1 iteration is required".to_string()));
        }

        let mut details = Vec::with_capacity(iterations);
        let mut result_data = None;
        for _ in 0..iterations {
            let (detail, data) = self.measure_once(operation).await;
            if detail.success {
                result_data = data;
            }
            details.push(detail);
        }

        let successes: Vec<&PerformanceDetail> = details.iter().filter(|d| d.success).collect();
        let successful = successes.len();
        let average = |field: fn(&PerformanceDetail) -> f64| {
            if successful == 0 {
                0.0
            } else {
                successes.iter().map(|d| field(d)).sum::<f64>() / successful as f64
            }
        };
        let average_wall_time_ms = average(|d| d.wall_time_ms);
        let average_cpu_time_ms = average(|d| d.cpu_time_ms);
        let average_memory_mb = average(|d| d.memory_used_mb);
        let peak_memory_mb = successes
            .iter()
            .map(|d| d.peak_memory_mb)
            .fold(0.0, f64::max);

        debug!(
            operation = operation.name(),
            iterations, successful, average_wall_time_ms, "measured executions"
        );

        Ok(PerformanceReport {
            total_executions: iterations,
            successful_executions: successful,
            failed_executions: iterations - successful,
            average_wall_time_ms,
            average_cpu_time_ms,
            average_memory_mb,
            peak_memory_mb,
            details,
            result_data,
        })
    }

    /// Run `warmup` unmeasured executions (errors ignored), then measure `rounds`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profiling`] if `rounds` is 0.
    pub async fn profile_custom_operation(
        &self,
        operation: &Operation,
        rounds: usize,
        warmup: usize,
    ) -> Result<PerformanceReport> {
        for _ in 0..warmup {
            if let Err(e) = self.run_limited(operation).await {
                debug!(operation = operation.name(), error = %e, "warmup execution failed");
            }
        }
        self.measure_multiple_executions(operation, rounds)
            .await
            .map_err(|e| Error::Profiling(format!("Custom operation profiling failed: {e}")))
    }

    /// Profile a predefined operation by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profiling`] for an unknown name or zero rounds.
    pub async fn profile_operation(
        &self,
        operation_name: &str,
        rounds: usize,
        warmup: usize,
    ) -> Result<PerformanceReport> {
        let predefined = PredefinedOperation::from_name(operation_name).ok_or_else(|| {
            Error::Profiling(format!(
                "Unknown operation '{operation_name}'. Available: {:?}",
                PredefinedOperation::available()
            ))
        })?;
        self.profile_custom_operation(&predefined.to_operation(), rounds, warmup)
            .await
    }

    /// Measure each operation once, keyed by operation name.
    pub async fn profile_pipeline(
        &self,
        operations: &[Operation],
    ) -> BTreeMap<String, PerformanceReport> {
        let mut reports = BTreeMap::new();
        for operation in operations {
            let report = self.measure_performance(operation).await;
            reports.insert(operation.name().to_string(), report);
        }
        reports
    }

    async fn run_limited(&self, operation: &Operation) -> anyhow::Result<Value> {
        if operation.is_async() {
            tokio::time::timeout(self.timeout, operation.invoke())
                .await
                .map_err(|_| anyhow::anyhow!(self.timeout_message(self.timeout)))?
        } else {
            operation.invoke().await
        }
    }

    fn timeout_message(&self, elapsed: Duration) -> String {
        format!(
            "Execution timeout exceeded: {:.2}s > {}s",
            elapsed.as_secs_f64(),
            self.timeout.as_secs_f64()
        )
    }

    async fn measure_once(&self, operation: &Operation) -> (PerformanceDetail, Option<Value>) {
        let tracking = self.memory_profiling && alloc::is_installed();
        if tracking {
            alloc::reset_peak();
        }
        let heap_before = alloc::current_bytes();
        let rss_before = resources::current_rss_mb();
        let cpu_before = resources::process_cpu_time_ms();
        let start = Instant::now();

        let outcome = self.run_limited(operation).await;

        let elapsed = start.elapsed();
        let cpu_time_ms = (resources::process_cpu_time_ms() - cpu_before).max(0.0);
        let rss_after = resources::current_rss_mb();
        let memory_used_mb = (rss_after - rss_before).max(0.0);
        let peak_memory_mb = if !self.memory_profiling {
            0.0
        } else if tracking {
            resources::bytes_to_mb(alloc::peak_bytes().saturating_sub(heap_before))
        } else {
            memory_used_mb
        };

        let outcome = outcome.and_then(|value| {
            if elapsed > self.timeout {
                anyhow::bail!(self.timeout_message(elapsed));
            }
            let observed = rss_after.max(peak_memory_mb);
            if observed > self.memory_limit_mb {
                anyhow::bail!(
                    "Memory limit exceeded: {observed:.2}MB > {}MB",
                    self.memory_limit_mb
                );
            }
            Ok(value)
        });

        let wall_time_ms = elapsed.as_secs_f64() * 1_000.0;
        match outcome {
            Ok(value) => (
                PerformanceDetail {
                    wall_time_ms,
                    cpu_time_ms,
                    memory_used_mb,
                    peak_memory_mb,
                    function_name: operation.name().to_string(),
                    success: true,
                    error_message: None,
                },
                Some(value),
            ),
            Err(e) => {
                warn!(operation = operation.name(), error = %e, "execution failed");
                (
                    PerformanceDetail {
                        wall_time_ms,
                        cpu_time_ms,
                        memory_used_mb,
                        peak_memory_mb: 0.0,
                        function_name: operation.name().to_string(),
                        success: false,
                        error_message: Some(format!("{e:#}")),
                    },
                    None,
                )
            }
        }
    }
}
