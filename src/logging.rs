//! Tracing subscriber setup for binaries, demos and benches

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// `default_directive` (for example `"specbench=info"`) applies when
/// `RUST_LOG` is unset or invalid. Returns `false` if a global subscriber was
/// already installed.
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_existing_subscriber() {
        let _ = init("specbench=debug");
        assert!(!init("specbench=info"));
    }
}
