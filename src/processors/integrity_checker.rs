use crate::models::{FileStatus, RunSummary, TimeSeries};
use crate::utils::constants::DEFAULT_MIN_COVERAGE;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct SeriesQuality {
    pub station: String,
    pub date: NaiveDate,
    pub active: bool,
    pub observed: usize,
    pub missing: usize,
    pub coverage: f64,
    pub gap_count: usize,
    pub longest_gap: usize,
    pub out_of_range: usize,
    pub duplicates: usize,
    pub usable: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_flagged: usize,
    pub files_cancelled: usize,
    pub flagged_lines: usize,
    /// Skipped files per error kind.
    pub skip_reasons: BTreeMap<String, usize>,
    pub series: Vec<SeriesQuality>,
}

impl IntegrityReport {
    pub fn usable_series(&self) -> usize {
        self.series.iter().filter(|s| s.usable).count()
    }
}

/// Decides whether assembled days are good enough to map, and summarises a
/// run for people.
pub struct IntegrityChecker {
    min_coverage: f64,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }

    pub fn with_min_coverage(mut self, min_coverage: f64) -> Self {
        self.min_coverage = min_coverage.clamp(0.0, 1.0);
        self
    }

    pub fn assess(&self, series: &TimeSeries) -> SeriesQuality {
        let gaps = series.gap_report();
        let coverage = series.coverage();

        SeriesQuality {
            station: series.station().to_string(),
            date: series.day.date(),
            active: series.active,
            observed: series.observed_count(),
            missing: series.missing_count(),
            coverage,
            gap_count: gaps.len(),
            longest_gap: gaps.iter().map(|g| g.length).max().unwrap_or(0),
            out_of_range: series.out_of_range_count(),
            duplicates: series.duplicates.len(),
            usable: coverage >= self.min_coverage,
        }
    }

    pub fn is_usable(&self, series: &TimeSeries) -> bool {
        series.coverage() >= self.min_coverage
    }

    pub fn check_integrity(&self, series: &[TimeSeries], summary: &RunSummary) -> IntegrityReport {
        let mut report = IntegrityReport {
            files_processed: summary.processed().count(),
            files_flagged: summary.flagged().count(),
            files_cancelled: summary.cancelled_count(),
            flagged_lines: summary.flagged_line_count(),
            ..Default::default()
        };

        for outcome in &summary.outcomes {
            if let FileStatus::Skipped { kind, .. } = &outcome.status {
                report.files_skipped += 1;
                *report.skip_reasons.entry(kind.clone()).or_insert(0) += 1;
            }
        }

        report.series = series.iter().map(|s| self.assess(s)).collect();
        report
            .series
            .sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.station.cmp(&b.station)));

        report
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport, summary: &RunSummary) -> String {
        let mut text = String::new();

        text.push_str("=== Ingestion Report ===\n");
        text.push_str(&format!("Files processed: {}\n", report.files_processed));
        text.push_str(&format!("Files skipped: {}\n", report.files_skipped));
        for (kind, count) in &report.skip_reasons {
            text.push_str(&format!("  {}: {}\n", kind, count));
        }
        text.push_str(&format!(
            "Files flagged: {} ({} bad lines)\n",
            report.files_flagged, report.flagged_lines
        ));
        if report.files_cancelled > 0 {
            text.push_str(&format!("Files cancelled: {}\n", report.files_cancelled));
        }

        text.push_str(&format!(
            "\nStation-days: {} ({} usable at {:.0}% coverage)\n",
            report.series.len(),
            report.usable_series(),
            100.0 * self.min_coverage
        ));
        for quality in &report.series {
            text.push_str(&format!(
                "  {} {}: {:.1}% observed, {} gaps (longest {}s), {} out of range, {} duplicates{}{}\n",
                quality.station.to_uppercase(),
                quality.date,
                100.0 * quality.coverage,
                quality.gap_count,
                quality.longest_gap,
                quality.out_of_range,
                quality.duplicates,
                if quality.usable { "" } else { " [unusable]" },
                if quality.active { "" } else { " [deactivated]" },
            ));
        }

        let skipped: Vec<_> = summary.skipped().take(10).collect();
        if !skipped.is_empty() {
            text.push_str("\nFirst skipped files:\n");
            for outcome in skipped {
                if let FileStatus::Skipped { reason, .. } = &outcome.status {
                    text.push_str(&format!("  {}: {}\n", outcome.path.display(), reason));
                }
            }
        }

        text
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::models::{FileOutcome, LineError, StationMetadata, StationDay};
    use std::path::PathBuf;

    fn empty_series() -> TimeSeries {
        let station = StationMetadata::new("alf", -56.10, -9.87, false);
        TimeSeries::empty(StationDay::new("alf", 2023, 10).unwrap(), &station)
    }

    #[test]
    fn test_empty_day_is_unusable() {
        let quality = IntegrityChecker::new().assess(&empty_series());

        assert!(!quality.usable);
        assert_eq!(quality.gap_count, 1);
        assert_eq!(quality.longest_gap, 86_400);
        assert_eq!(quality.coverage, 0.0);
        assert!(IntegrityChecker::new().with_min_coverage(0.0).is_usable(&empty_series()));
    }

    #[test]
    fn test_report_counts_outcomes() {
        let mut summary = RunSummary::default();
        summary.push(FileOutcome {
            path: PathBuf::from("alf01000.zip"),
            key: None,
            status: FileStatus::Processed {
                samples: 10,
                out_of_range: 0,
                duplicates: 0,
            },
            attempts: 1,
            flagged_lines: vec![LineError {
                line: 7,
                reason: "expected 8 columns, found 7".to_string(),
            }],
        });
        summary.push(FileOutcome::skipped(
            PathBuf::from("xyz01000.zip"),
            None,
            &ProcessingError::UnknownStation {
                code: "xyz".to_string(),
            },
        ));

        let checker = IntegrityChecker::new();
        let report = checker.check_integrity(&[empty_series()], &summary);

        assert_eq!(report.files_processed, 1);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.files_flagged, 1);
        assert_eq!(report.flagged_lines, 1);
        assert_eq!(report.skip_reasons.get("UnknownStation"), Some(&1));

        let text = checker.generate_summary(&report, &summary);
        assert!(text.contains("Files skipped: 1"));
        assert!(text.contains("ALF 2023-01-10"));
        assert!(text.contains("[deactivated]"));
        assert!(text.contains("xyz01000.zip"));
    }
}
