//! Stage results and the end-of-run summary.
//!
//! Each stage returns its own [`StageReport`]; the orchestrator merges them
//! into a [`RunSummary`] instead of mutating shared counters.

use log::{error, info, warn};
use serde::Serialize;

const BANNER: &str = "============================================================";

/// Outcome of one pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub success: usize,
    pub total: usize,
    /// Item-level failures, absorbed by the stage
    pub failures: Vec<String>,
    /// Stage-level failure that stopped the stage early
    pub fatal: Option<String>,
}

impl StageReport {
    pub fn new(stage: &str) -> Self {
        Self { stage: stage.to_string(), ..Default::default() }
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.success, self.total)
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    pub fn abort(&mut self, message: impl Into<String>) {
        self.fatal = Some(message.into());
    }

    pub fn succeeded(&self) -> bool {
        self.success > 0
    }

    pub fn success_rate(&self) -> f64 {
        round2(self.success as f64 / self.total.max(1) as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageResult {
    pub success: usize,
    pub total: usize,
    pub success_rate: f64,
}

impl From<&StageReport> for StageResult {
    fn from(report: &StageReport) -> Self {
        Self { success: report.success, total: report.total, success_rate: report.success_rate() }
    }
}

/// Staged CSV and published JSON files present on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileStatistics {
    pub csv_files: usize,
    pub json_files: usize,
    pub csv_file_list: Vec<String>,
    pub json_file_list: Vec<String>,
}

impl FileStatistics {
    pub fn new(csv_file_list: Vec<String>, json_file_list: Vec<String>) -> Self {
        Self {
            csv_files: csv_file_list.len(),
            json_files: json_file_list.len(),
            csv_file_list,
            json_file_list,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Wall-clock seconds, two decimals
    pub execution_time: f64,
    pub crawl_results: StageResult,
    pub conversion_results: StageResult,
    pub file_statistics: FileStatistics,
    pub errors: Vec<String>,
    pub overall_success: bool,
}

impl RunSummary {
    pub fn new(
        execution_secs: f64,
        crawl: &StageReport,
        convert: &StageReport,
        file_statistics: FileStatistics,
        errors: Vec<String>,
    ) -> Self {
        let overall_success = errors.is_empty() && crawl.succeeded() && convert.succeeded();
        Self {
            execution_time: round2(execution_secs),
            crawl_results: crawl.into(),
            conversion_results: convert.into(),
            file_statistics,
            errors,
            overall_success,
        }
    }

    pub fn log(&self) {
        info!("{}", BANNER);
        info!("Run summary");
        info!("{}", BANNER);
        info!("Execution time: {} s", self.execution_time);

        let crawl = &self.crawl_results;
        info!(
            "Crawl: {}/{} files ({}% success)",
            crawl.success, crawl.total, crawl.success_rate
        );
        let convert = &self.conversion_results;
        info!(
            "Conversion: {}/{} files ({}% success)",
            convert.success, convert.total, convert.success_rate
        );

        let files = &self.file_statistics;
        info!("Files on disk: {} CSV, {} JSON", files.csv_files, files.json_files);

        if !self.errors.is_empty() {
            error!("{} error(s) occurred:", self.errors.len());
            for (i, message) in self.errors.iter().enumerate() {
                error!("  {}. {}", i + 1, message);
            }
        }

        if self.overall_success {
            info!("Overall status: success");
        } else {
            warn!("Overall status: failed");
        }
        info!("{}", BANNER);
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
