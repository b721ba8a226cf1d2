use super::dates::convert_date;
use super::flags::convert_holiday_flag;
use crate::error::ConvertError;
use serde::{Deserialize, Serialize};

/// One normalised calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    /// `YYYY-MM-DD`, or the trimmed source text if it could not be parsed
    pub date: String,
    pub week: String,
    pub is_holiday: bool,
    pub description: String,
}

impl DayRecord {
    /// Build a record from a row laid out as date, weekday, flag,
    /// description. Missing trailing cells default to empty; a row without
    /// a date cell is rejected.
    pub fn from_row(row: &[String], index: usize) -> Result<Self, ConvertError> {
        let cell = |i: usize| row.get(i).map(|value| value.trim()).unwrap_or("");

        let date = cell(0);
        if date.is_empty() {
            return Err(ConvertError::RowConversion {
                row: index,
                reason: "missing date".to_string(),
            });
        }

        let flag = row.get(2).map(String::as_str).unwrap_or(super::flags::WORKDAY_CODE);

        Ok(Self {
            date: convert_date(date),
            week: cell(1).to_string(),
            is_holiday: convert_holiday_flag(flag),
            description: cell(3).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_full_row() {
        let record = DayRecord::from_row(&row(&["20250101", " 三 ", "2", " 開國紀念日 "]), 1).unwrap();
        assert_eq!(
            record,
            DayRecord {
                date: "2025-01-01".to_string(),
                week: "三".to_string(),
                is_holiday: true,
                description: "開國紀念日".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_trailing_cells_default() {
        let record = DayRecord::from_row(&row(&["2025/1/2"]), 1).unwrap();
        assert_eq!(record.date, "2025-01-02");
        assert_eq!(record.week, "");
        assert!(!record.is_holiday);
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_missing_date_is_rejected() {
        let err = DayRecord::from_row(&row(&["  ", "四", "0", ""]), 7).unwrap_err();
        assert!(matches!(err, ConvertError::RowConversion { row: 7, .. }));
    }

    #[test]
    fn test_serializes_camel_case_with_literal_text() {
        let record = DayRecord::from_row(&row(&["2025-01-01", "三", "2", "開國紀念日"]), 1).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2025-01-01","week":"三","isHoliday":true,"description":"開國紀念日"}"#
        );
    }
}
