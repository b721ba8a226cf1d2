//! Record normaliser: staged CSV files in, one JSON array per calendar year out.

pub mod dates;
pub mod encoding;
pub mod flags;
pub mod record;
pub mod table;
pub mod year;

pub use dates::convert_date;
pub use flags::convert_holiday_flag;
pub use record::DayRecord;
pub use table::{Table, read_tabular_file, validate_structure};
pub use year::{extract_source_year, output_filename, year_offset};

use crate::config::Config;
use crate::error::ConvertError;
use crate::report::{FileStatistics, StageReport};
use log::{error, info, warn};
use scopeguard::ScopeGuard;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of converting one staged file
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    pub records: usize,
    /// Rows that could not be converted, already formatted for reporting
    pub skipped_rows: Vec<String>,
}

pub struct Converter {
    staging_dir: PathBuf,
    output_dir: PathBuf,
}

impl Converter {
    pub fn new(staging_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self { staging_dir: staging_dir.into(), output_dir: output_dir.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.storage.staging_dir, &config.storage.output_dir)
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Staged `*.csv` files (suffix matched case-insensitively)
    pub fn csv_files(&self) -> Vec<PathBuf> {
        list_files(&self.staging_dir, "csv")
    }

    /// Published `*.json` files
    pub fn json_files(&self) -> Vec<PathBuf> {
        list_files(&self.output_dir, "json")
    }

    /// Convert every data row of `table`, collecting the rows that fail.
    /// Row numbers are 1-based, counting data rows only.
    pub fn convert_records(&self, table: &Table) -> (Vec<DayRecord>, Vec<ConvertError>) {
        let mut records = Vec::with_capacity(table.rows.len());
        let mut failures = Vec::new();

        for (index, row) in table.rows.iter().enumerate() {
            match DayRecord::from_row(row, index + 1) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping row {}: {}", index + 1, e);
                    failures.push(e);
                }
            }
        }

        (records, failures)
    }

    /// Convert one staged CSV file and write its JSON array, replacing any
    /// previous output for the same year.
    pub fn convert_file(&self, path: &Path) -> Result<ConvertedFile, ConvertError> {
        let table = read_tabular_file(path);
        if table.is_empty() && table.headers.is_empty() {
            return Err(ConvertError::ReadFailure(path.to_path_buf()));
        }
        validate_structure(&table)?;

        let (records, failures) = self.convert_records(&table);
        if records.is_empty() {
            return Err(ConvertError::NoRecordsProduced(path.to_path_buf()));
        }

        fs::create_dir_all(&self.output_dir)?;
        let output = self.output_dir.join(output_filename(path));
        write_records(&output, &records)?;

        info!(
            "Wrote {} ({} records, {} rows skipped)",
            output.display(),
            records.len(),
            failures.len()
        );

        Ok(ConvertedFile {
            source: path.to_path_buf(),
            output,
            records: records.len(),
            skipped_rows: failures.iter().map(ToString::to_string).collect(),
        })
    }

    /// Convert every staged file independently
    pub fn convert_all(&self) -> StageReport {
        let mut report = StageReport::new("convert");
        info!("Starting batch conversion from {}", self.staging_dir.display());

        let files = self.csv_files();
        if files.is_empty() {
            warn!("No CSV files found in {}", self.staging_dir.display());
            return report;
        }
        report.total = files.len();

        for (index, file) in files.iter().enumerate() {
            let name = display_name(file);
            info!("Converting file {}/{}: {}", index + 1, report.total, name);

            match self.convert_file(file) {
                Ok(converted) => {
                    report.record_success();
                    for skipped in converted.skipped_rows {
                        report.record_failure(format!("{}: {}", name, skipped));
                    }
                }
                Err(e) => {
                    error!("Conversion of {} failed: {}", name, e);
                    report.record_failure(format!("{}: {}", name, e));
                }
            }
        }

        info!("Batch conversion finished: {}/{} files converted", report.success, report.total);
        report
    }

    pub fn conversion_summary(&self) -> FileStatistics {
        let names = |paths: Vec<PathBuf>| -> Vec<String> { paths.iter().map(|p| display_name(p)).collect() };
        FileStatistics::new(names(self.csv_files()), names(self.json_files()))
    }
}

fn list_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Directory does not exist: {}", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Write through a temporary sibling and rename, so the target is either
/// the old content or the complete new array.
fn write_records(path: &Path, records: &[DayRecord]) -> Result<(), ConvertError> {
    let json = serde_json::to_vec_pretty(records)?;
    let tmp = path.with_extension("json.tmp");

    let cleanup = scopeguard::guard((), |_| {
        let _ = fs::remove_file(&tmp);
    });
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    ScopeGuard::into_inner(cleanup);

    Ok(())
}
