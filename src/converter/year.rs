use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Gregorian year = ROC year + 1911
pub const ROC_YEAR_OFFSET: i32 = 1911;

// e.g. "114年中華民國政府行政機關辦公日曆表.csv"
static ROC_YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{3})年").expect("static regex"));

/// ROC year embedded in a file name, or 0 when there is none
pub fn extract_source_year(filename: &str) -> i32 {
    match ROC_YEAR_PATTERN.captures(filename).and_then(|caps| caps[1].parse::<i32>().ok()) {
        Some(year) => {
            info!("ROC year {} found in '{}'", year, filename);
            year
        }
        None => {
            warn!("No ROC year found in '{}'", filename);
            0
        }
    }
}

/// Convert an ROC year to the Gregorian year; 0 stays "unknown"
pub fn year_offset(roc_year: i32) -> i32 {
    if roc_year <= 0 {
        return 0;
    }
    roc_year + ROC_YEAR_OFFSET
}

/// `<gregorian year>.json`, or the source stem with `.json` when the
/// file name carries no year
pub fn output_filename(source: &Path) -> String {
    let filename = source.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    let year = year_offset(extract_source_year(&filename));
    if year > 0 {
        return format!("{}.json", year);
    }

    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    format!("{}.json", stem)
}
