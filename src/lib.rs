//! # specbench: Experiment Runner for Requirements Tooling
//!
//! specbench runs measurement experiments against requirement-processing tools and
//! compares their outcomes statistically.
//!
//! ## Experiment Types
//!
//! - **EARS coverage**: requirement pattern compliance reported by a
//!   [`providers::CoverageAnalyzer`]
//! - **Performance**: wall time, CPU time and memory of an operation under
//!   time and memory limits
//! - **Language detection**: accuracy of a [`providers::LanguageClassifier`]
//!   over labelled documents
//! - **Comparative**: per-metric t-tests, effect sizes and recommendations
//!   across finished experiments
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use specbench::api::ExperimentApi;
//! use specbench::experiment::{ExperimentType, OutputFormat};
//!
//! # #[tokio::main]
//! # async fn main() -> specbench::Result<()> {
//! specbench::logging::init("specbench=info");
//! let api = ExperimentApi::builder().config_dir(".specbench/experiments").build()?;
//!
//! let config = api.manager().create_default_config(ExperimentType::Performance);
//! let result = api.execute(config).await?;
//! println!("{}", result.metadata()["formatted_outputs"][OutputFormat::Json.extension()]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod api;
pub mod comparative;
pub mod error;
pub mod experiment;
pub mod logging;
pub mod output;
pub mod profiler;
pub mod providers;
pub mod stats;

pub use api::{ExperimentApi, ExperimentApiBuilder};
pub use comparative::ComparativeAnalyzer;
pub use error::{Error, Result};
pub use experiment::{ExperimentManager, ExperimentResult, ExperimentStatus, ExperimentType};
pub use output::OutputFormatter;
pub use profiler::{Operation, PerformanceProfiler};
pub use stats::StatisticsEngine;
