use super::encoding::decode_attempts;
use crate::error::ConvertError;
use csv::ReaderBuilder;
use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;

/// Minimum columns: date, weekday, holiday flag, description
pub const MIN_COLUMNS: usize = 4;

/// A parsed CSV file: the header row and the data rows beneath it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// Parse CSV text whose first row is the header. Rows may be ragged.
pub fn parse_table(text: &str) -> Result<Table, csv::Error> {
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(text.as_bytes());

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

/// Read and parse a CSV file, trying each candidate encoding in turn.
///
/// Never fails: an unreadable or unparseable file yields an empty table,
/// which [`validate_structure`] then rejects.
pub fn read_tabular_file(path: &Path) -> Table {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    info!("Reading CSV file: {}", name);

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            return Table::default();
        }
    };

    for decoded in decode_attempts(&bytes) {
        if decoded.encoding.is_none() {
            warn!("No candidate encoding fits {}, decoding leniently", name);
        }
        match parse_table(&decoded.text) {
            Ok(table) => {
                info!("Read {} rows from {} (encoding: {})", table.rows.len(), name, decoded.label());
                return table;
            }
            Err(e) => debug!("Parsing {} as {} failed: {}", name, decoded.label(), e),
        }
    }

    error!("Could not parse {} as CSV", name);
    Table::default()
}

pub fn validate_structure(table: &Table) -> Result<(), ConvertError> {
    if table.is_empty() {
        return Err(ConvertError::StructureInvalid("table has no data rows".to_string()));
    }

    let columns = table.column_count();
    if columns < MIN_COLUMNS {
        return Err(ConvertError::StructureInvalid(format!(
            "only {} columns, at least {} required",
            columns, MIN_COLUMNS
        )));
    }

    debug!("Table structure ok: {} columns, {} rows", columns, table.rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::BIG5;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_parse_table_splits_header_and_rows() {
        let table = parse_table("西元日期,星期,是否放假,備註\n20250101,三,2,開國紀念日\n20250102,四,0,\n").unwrap();

        assert_eq!(table.headers, vec!["西元日期", "星期", "是否放假", "備註"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][3], "開國紀念日");
        assert_eq!(table.rows[1][3], "");
    }

    #[test]
    fn test_ragged_rows_are_kept() {
        let table = parse_table("a,b,c,d\n1,2\n").unwrap();
        assert_eq!(table.rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn test_read_big5_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cal.csv");
        let (bytes, _, _) = BIG5.encode("西元日期,星期,是否放假,備註\n20250101,三,2,開國紀念日\n");
        fs::write(&path, &bytes).unwrap();

        let table = read_tabular_file(&path);
        assert_eq!(table.rows[0][1], "三");
        assert_eq!(table.rows[0][3], "開國紀念日");
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        assert!(read_tabular_file(&dir.path().join("missing.csv")).is_empty());
    }

    #[test]
    fn test_validate_structure() {
        assert!(validate_structure(&Table::default()).is_err());
        assert!(validate_structure(&parse_table("a,b,c\n1,2,3\n").unwrap()).is_err());
        assert!(validate_structure(&parse_table("a,b,c,d\n").unwrap()).is_err());
        assert!(validate_structure(&parse_table("a,b,c,d\n1,2,3,4\n").unwrap()).is_ok());
    }
}
