//! Experiment Workflow Example
//!
//! Runs two performance experiments on predefined operations, compares them
//! statistically and writes the comparison to disk.
//!
//! Run with: cargo run --example experiment_workflow

use serde_json::json;
use specbench::api::ExperimentApi;
use specbench::experiment::{
    ComparativeParameters, ExperimentParameters, OutputFormat, PerformanceParameters,
};
use specbench::profiler::Operation;

fn performance(operation_name: &str) -> ExperimentParameters {
    ExperimentParameters::Performance(PerformanceParameters {
        operation_name: operation_name.to_string(),
        measurement_rounds: 10,
        warmup_rounds: 2,
        memory_profiling: true,
    })
}

#[tokio::main]
async fn main() -> specbench::Result<()> {
    specbench::logging::init("specbench=info");
    println!("=== specbench Experiment Workflow ===\n");

    let workdir = tempfile::tempdir()?;
    let api = ExperimentApi::builder()
        .config_dir(workdir.path().join("experiments"))
        .register_operation(Operation::blocking("sort_10k", || {
            let mut values: Vec<u64> = (0..10_000u64).rev().collect();
            values.sort_unstable();
            Ok(json!(values[0]))
        }))
        .build()?;

    // -------------------------------------------------------------------------
    // 1. Baseline and candidate measurements
    // -------------------------------------------------------------------------
    println!("1. Measuring operations...");
    let baseline = api
        .run_experiment(performance("cpu_intensive"), vec![OutputFormat::Json], 60, 4096)
        .await?;
    let candidate = api
        .run_experiment(performance("sort_10k"), vec![OutputFormat::Json], 60, 4096)
        .await?;

    for result in [&baseline, &candidate] {
        if let Some(report) = result.performance_report() {
            println!(
                "   {} [{}]: {}/{} ok, avg wall {:.3} ms, avg cpu {:.3} ms",
                result.experiment_id(),
                result.status(),
                report.successful_executions,
                report.total_executions,
                report.average_wall_time_ms,
                report.average_cpu_time_ms
            );
        }
    }

    // -------------------------------------------------------------------------
    // 2. Statistical comparison
    // -------------------------------------------------------------------------
    println!("\n2. Comparing candidate against baseline...");
    let comparison = api
        .run_experiment(
            ExperimentParameters::Comparative(ComparativeParameters {
                baseline_experiment_id: Some(baseline.experiment_id().to_string()),
                comparison_experiment_ids: vec![candidate.experiment_id().to_string()],
                metrics_to_compare: None,
            }),
            vec![OutputFormat::Json, OutputFormat::Csv],
            60,
            4096,
        )
        .await?;

    let metadata = comparison.metadata();
    println!("   Comparisons: {}", metadata["total_comparisons"]);
    println!("   Significant: {}", metadata["significant_differences"]);
    if let Some(recommendations) = metadata["comparative_report"]["recommendations"].as_array() {
        for recommendation in recommendations {
            println!("   - {}", recommendation.as_str().unwrap_or_default());
        }
    }

    // -------------------------------------------------------------------------
    // 3. Export
    // -------------------------------------------------------------------------
    println!("\n3. Exporting comparison...");
    let path = api.export_report(
        comparison.experiment_id(),
        &workdir.path().join("comparison"),
        OutputFormat::Csv,
    )?;
    println!("   Wrote {}", path.display());

    let removed = api.manager().cleanup_completed_experiments();
    println!("\n=== Done ({removed} finished experiments cleaned up) ===");
    Ok(())
}
