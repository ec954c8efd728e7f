//! Measurement providers
//!
//! The requirement-pattern grammar and the language heuristic live outside
//! this crate. Experiments consume them through [`CoverageAnalyzer`] and
//! [`LanguageClassifier`]; this module also assembles their outputs into
//! multi-document reports.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::experiment::{
    DetailLevel, EarsCoverageReport, Language, LanguageDetectionReport, LanguageDetectionResult,
};
use crate::stats::StatisticsEngine;
use crate::{Error, Result};

/// Accuracy a language classifier must reach to be considered fit.
pub const REQUIRED_ACCURACY: f64 = 0.9;

/// Options passed to a [`CoverageAnalyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Language the requirements are written in.
    pub language: Language,
    /// Whether violations should be reported individually.
    pub detail_level: DetailLevel,
}

/// Decides which requirements in a document follow an EARS pattern.
pub trait CoverageAnalyzer: Send + Sync {
    /// Analyze one document whose text is `content`.
    ///
    /// # Errors
    ///
    /// Implementations return any failure to parse or analyze the document.
    fn analyze_document(
        &self,
        path: &Path,
        content: &str,
        options: AnalysisOptions,
    ) -> anyhow::Result<EarsCoverageReport>;
}

/// Output of a [`LanguageClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanguageClassification {
    /// Detected language.
    pub language: Language,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Tags a document with its language.
pub trait LanguageClassifier: Send + Sync {
    /// Classify `content`; structured requirement documents may use section-heading cues.
    fn classify(&self, content: &str, is_spec_document: bool) -> LanguageClassification;
}

/// Merge per-document coverage reports.
///
/// Totals are summed, violations concatenated and the rate recomputed (0 with
/// no requirements). The first document path stands for the combination.
///
/// # Errors
///
/// Returns [`Error::InsufficientData`] if `reports` is empty.
#[allow(clippy::cast_precision_loss)]
pub fn combine_coverage_reports(reports: Vec<EarsCoverageReport>) -> Result<EarsCoverageReport> {
    let mut reports = reports.into_iter();
    let Some(mut combined) = reports.next() else {
        return Err(Error::InsufficientData(
            "No coverage reports to combine".to_string(),
        ));
    };
    for report in reports {
        combined.total_requirements += report.total_requirements;
        combined.ears_compliant += report.ears_compliant;
        combined.violations.extend(report.violations);
    }
    combined.coverage_rate = if combined.total_requirements > 0 {
        combined.ears_compliant as f64 / combined.total_requirements as f64
    } else {
        0.0
    };
    Ok(combined)
}

/// Build a detection result for one document.
#[must_use]
pub fn detection_result(
    path: &Path,
    expected_language: Language,
    classification: LanguageClassification,
) -> LanguageDetectionResult {
    LanguageDetectionResult {
        document_path: path.display().to_string(),
        expected_language,
        detected_language: classification.language,
        confidence_score: classification.confidence,
        is_correct: classification.language == expected_language,
    }
}

/// Overall and per-language accuracy plus confidence statistics.
///
/// Per-language accuracy is 0 when no document expected that language.
///
/// # Errors
///
/// Returns [`Error::InsufficientData`] if `results` is empty and
/// [`Error::InvalidData`] if a confidence score is not finite.
pub fn generate_accuracy_report(
    results: Vec<LanguageDetectionResult>,
) -> Result<LanguageDetectionReport> {
    if results.is_empty() {
        return Err(Error::InsufficientData(
            "No results provided for report generation".to_string(),
        ));
    }
    let accuracy = |language: Option<Language>| {
        let (correct, total) = results
            .iter()
            .filter(|r| language.map_or(true, |l| r.expected_language == l))
            .fold((0_u32, 0_u32), |(correct, total), r| {
                (correct + u32::from(r.is_correct), total + 1)
            });
        if total == 0 {
            0.0
        } else {
            f64::from(correct) / f64::from(total)
        }
    };
    let confidences: Vec<f64> = results.iter().map(|r| r.confidence_score).collect();

    Ok(LanguageDetectionReport {
        accuracy_rate: accuracy(None),
        japanese_accuracy: accuracy(Some(Language::Japanese)),
        english_accuracy: accuracy(Some(Language::English)),
        statistics: StatisticsEngine::calculate_descriptive_stats(&confidences)?,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::CoverageViolation;

    fn coverage(path: &str, total: usize, compliant: usize, violations: usize) -> EarsCoverageReport {
        EarsCoverageReport {
            document_path: path.to_string(),
            total_requirements: total,
            ears_compliant: compliant,
            coverage_rate: 0.0,
            violations: (0..violations)
                .map(|i| CoverageViolation {
                    line_number: i + 1,
                    requirement_text: format!("req {i}"),
                    violation_type: "missing_shall".to_string(),
                    suggestion: None,
                })
                .collect(),
        }
    }

    fn result(expected: Language, detected: Language, confidence: f64) -> LanguageDetectionResult {
        detection_result(
            Path::new("doc.md"),
            expected,
            LanguageClassification {
                language: detected,
                confidence,
            },
        )
    }

    #[test]
    fn test_combine_sums_totals() {
        let combined = combine_coverage_reports(vec![
            coverage("a.md", 4, 3, 1),
            coverage("b.md", 6, 3, 3),
        ])
        .unwrap();
        assert_eq!(combined.document_path, "a.md");
        assert_eq!(combined.total_requirements, 10);
        assert_eq!(combined.ears_compliant, 6);
        assert_eq!(combined.violations.len(), 4);
        assert!((combined.coverage_rate - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_combine_without_requirements() {
        let combined = combine_coverage_reports(vec![coverage("a.md", 0, 0, 0)]).unwrap();
        assert!(combined.coverage_rate.abs() < f64::EPSILON);
        assert!(combine_coverage_reports(Vec::new()).is_err());
    }

    #[test]
    fn test_accuracy_report() {
        let report = generate_accuracy_report(vec![
            result(Language::Japanese, Language::Japanese, 0.9),
            result(Language::Japanese, Language::English, 0.6),
            result(Language::English, Language::English, 0.9),
            result(Language::English, Language::English, 0.8),
        ])
        .unwrap();
        assert!((report.accuracy_rate - 0.75).abs() < 1e-12);
        assert!((report.japanese_accuracy - 0.5).abs() < 1e-12);
        assert!((report.english_accuracy - 1.0).abs() < 1e-12);
        assert_eq!(report.statistics.sample_size, 4);
        assert!((report.statistics.mean - 0.8).abs() < 1e-12);
        assert!(!report.results[1].is_correct);
    }

    #[test]
    fn test_accuracy_missing_language_is_zero() {
        let report =
            generate_accuracy_report(vec![result(Language::English, Language::English, 1.0)])
                .unwrap();
        assert!(report.japanese_accuracy.abs() < f64::EPSILON);
        assert!((report.english_accuracy - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_accuracy_requires_results() {
        let err = generate_accuracy_report(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }
}
