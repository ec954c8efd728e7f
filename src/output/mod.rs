//! Output formatting: JSON, CSV and YAML rendering plus retrying file writes

mod tabular;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::experiment::{ComparativeExperimentReport, OutputFormat};
use crate::{Error, Result};

/// Default number of write attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Renders serializable reports and writes them to disk.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    max_retries: u32,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter {
    /// Create a formatter with three write attempts.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the number of write attempts (at least one).
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Number of write attempts.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Serialize to JSON, pretty-printed with two-space indentation if `pretty`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatConversion`] if serialization fails.
    pub fn format_to_json<T: Serialize + ?Sized>(&self, data: &T, pretty: bool) -> Result<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };
        rendered.map_err(|e| Error::FormatConversion(format!("Failed to convert to JSON: {e}")))
    }

    /// Serialize to CSV with a header row.
    ///
    /// Missing cells are empty, nested maps are flattened into
    /// `parent_child` columns and lists are written as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatConversion`] if serialization fails.
    pub fn format_to_csv<T: Serialize + ?Sized>(
        &self,
        data: &T,
        headers: Option<&[String]>,
    ) -> Result<String> {
        let value = to_value(data)?;
        tabular::write_rows(&tabular::rows_for(value), headers)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatConversion`] if serialization fails.
    pub fn format_to_yaml<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        serde_yaml::to_string(data)
            .map_err(|e| Error::FormatConversion(format!("Failed to convert to YAML: {e}")))
    }

    /// Render in `format` (pretty JSON, CSV with default headers, YAML).
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatConversion`] if serialization fails.
    pub fn format<T: Serialize + ?Sized>(&self, data: &T, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => self.format_to_json(data, true),
            OutputFormat::Csv => self.format_to_csv(data, None),
            OutputFormat::Yaml => self.format_to_yaml(data),
        }
    }

    /// Render a comparative report; its CSV has one row per comparison.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatConversion`] if serialization fails.
    pub fn format_comparative_report(
        &self,
        report: &ComparativeExperimentReport,
        format: OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Csv => {
                let rows: Vec<Value> = report
                    .comparisons
                    .iter()
                    .map(|c| {
                        let stats = &c.statistical_comparison;
                        json!({
                            "metric_name": c.metric_name,
                            "baseline_experiment_id": c.baseline_experiment_id,
                            "comparison_experiment_id": c.comparison_experiment_id,
                            "baseline_mean": stats.baseline_mean,
                            "comparison_mean": stats.comparison_mean,
                            "improvement_percentage": c.improvement_percentage,
                            "p_value": stats.p_value,
                            "is_significant": stats.is_significant,
                            "effect_size": stats.effect_size,
                            "confidence_interval_lower": stats.confidence_interval_lower,
                            "confidence_interval_upper": stats.confidence_interval_upper,
                        })
                    })
                    .collect();
                self.format_to_csv(&rows, None)
            }
            other => self.format(report, other),
        }
    }

    /// Write `data` in `format` to `path` with the format's extension.
    ///
    /// The first attempt writes in place; later attempts write a temporary
    /// file next to the target and atomically rename it. Returns the path
    /// actually written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatConversion`] if rendering fails and
    /// [`Error::FileWrite`] (carrying the last I/O error) once every attempt
    /// has failed.
    pub fn save_to_file<T: Serialize + ?Sized>(
        &self,
        data: &T,
        path: &Path,
        format: OutputFormat,
    ) -> Result<PathBuf> {
        let content = self.format(data, format)?;
        self.save_rendered(&content, path, format)
    }

    /// Write already rendered `content` with the retry policy of
    /// [`Self::save_to_file`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileWrite`] once every attempt has failed.
    pub fn save_rendered(&self, content: &str, path: &Path, format: OutputFormat) -> Result<PathBuf> {
        let path = path.with_extension(format.extension());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut last_error = None;
        for attempt in 1..=self.max_retries {
            let written = if attempt == 1 {
                fs::write(&path, content)
            } else {
                write_via_temp_file(&path, content)
            };
            match written {
                Ok(()) => {
                    debug!(path = %path.display(), attempt, "wrote output file");
                    return Ok(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), attempt, error = %e, "output write failed");
                    last_error = Some(e);
                }
            }
        }
        Err(Error::FileWrite {
            path,
            attempts: self.max_retries,
            source: last_error.unwrap_or_else(|| io::Error::other("no write attempted")),
        })
    }
}

fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value> {
    serde_json::to_value(data).map_err(|e| Error::FormatConversion(e.to_string()))
}

/// The temporary file is removed on every failure path when it is dropped.
fn write_via_temp_file(path: &Path, content: &str) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
