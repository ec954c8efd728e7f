//! Predefined operations available to performance experiments by name

use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};
use std::time::Duration;

use serde_json::{json, Value};

use super::Operation;

/// Built-in workloads used to sanity-check the profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedOperation {
    /// Sleeps 1 ms.
    Default,
    /// Allocates a 250 000 element vector.
    MemoryAllocation,
    /// Sums squares below 10 000.
    CpuIntensive,
    /// Writes and reads back a small temporary file.
    FileIo,
}

impl PredefinedOperation {
    /// Every predefined operation.
    pub const ALL: [Self; 4] = [
        Self::Default,
        Self::MemoryAllocation,
        Self::CpuIntensive,
        Self::FileIo,
    ];

    /// Name used in experiment parameters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default_operation",
            Self::MemoryAllocation => "memory_allocation",
            Self::CpuIntensive => "cpu_intensive",
            Self::FileIo => "file_io",
        }
    }

    /// Look up an operation by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Names of every predefined operation.
    #[must_use]
    pub fn available() -> Vec<&'static str> {
        Self::ALL.iter().map(|op| op.name()).collect()
    }

    /// Profilable operation running this workload.
    #[must_use]
    pub fn to_operation(self) -> Operation {
        match self {
            Self::Default => Operation::from_async(self.name(), || async {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(json!("default_operation_completed"))
            }),
            Self::MemoryAllocation => Operation::blocking(self.name(), memory_allocation),
            Self::CpuIntensive => Operation::blocking(self.name(), cpu_intensive),
            Self::FileIo => Operation::blocking(self.name(), file_io),
        }
    }
}

impl fmt::Display for PredefinedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[allow(clippy::unnecessary_wraps)]
fn memory_allocation() -> anyhow::Result<Value> {
    let values: Vec<u64> = (0..250_000).collect();
    let values = std::hint::black_box(values);
    Ok(json!(values.len()))
}

#[allow(clippy::unnecessary_wraps)]
fn cpu_intensive() -> anyhow::Result<Value> {
    let sum: u64 = (0..10_000u64).map(|i| i * i).sum();
    Ok(json!(std::hint::black_box(sum)))
}

fn file_io() -> anyhow::Result<Value> {
    let mut file = tempfile::tempfile()?;
    file.write_all("test data for file I/O operation\n".repeat(100).as_bytes())?;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(json!(contents.chars().take(50).collect::<String>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(
            PredefinedOperation::from_name("cpu_intensive"),
            Some(PredefinedOperation::CpuIntensive)
        );
        assert_eq!(PredefinedOperation::from_name("nope"), None);
        assert_eq!(
            PredefinedOperation::available(),
            vec!["default_operation", "memory_allocation", "cpu_intensive", "file_io"]
        );
    }

    #[test]
    fn test_workload_results() {
        assert_eq!(cpu_intensive().unwrap(), json!(333_283_335_000_u64));
        assert_eq!(memory_allocation().unwrap(), json!(250_000));
        let text = file_io().unwrap();
        assert_eq!(text.as_str().unwrap().chars().count(), 50);
        assert!(text.as_str().unwrap().starts_with("test data for file I/O operation"));
    }
}
