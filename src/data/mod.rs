//! Input boundary.
//!
//! Raw CSV files are read into a header-normalised [`Table`] and translated
//! once into typed records. Nothing downstream sees raw rows.

pub mod odds;
pub mod overrides;
pub mod projections;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::types::PropError;

/// Cells that mean "no value".
const NULL_TOKENS: &[&str] = &["", "nan", "na", "n/a", "none", "null"];

/// Normalise a header to snake_case: alphanumerics lowercased, any other
/// run of characters collapsed to one `_`, leading/trailing `_` trimmed.
pub fn snake_case(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    for c in header.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

pub fn is_null_cell(cell: &str) -> bool {
    let trimmed = cell.trim();
    NULL_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t))
}

/// Parse an optional float. Null-like cells are `Ok(None)`; anything else
/// that is not a number is `Err(())`.
pub fn parse_optional_f64(cell: &str) -> Result<Option<f64>, ()> {
    if is_null_cell(cell) {
        return Ok(None);
    }
    match cell.trim().parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(()),
    }
}

/// Parse an integer, accepting whole floats such as `2024.0`.
pub fn parse_integer(cell: &str) -> Option<i64> {
    let trimmed = cell.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    let v = trimmed.parse::<f64>().ok()?;
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}

/// A CSV file with snake_case headers.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a table from a CSV file. Other extensions are rejected.
    pub fn read(path: &Path, name: &str) -> Result<Self, PropError> {
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(PropError::UnsupportedFormat(path.display().to_string()));
        }
        let file = File::open(path)?;
        let table = Self::from_reader(file, name)?;
        debug!(path = %path.display(), table = name, rows = table.len(), "Table loaded");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, name: &str) -> Result<Self, PropError> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers()?.iter().map(snake_case).collect();
        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Fail with every missing column named, sorted.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), PropError> {
        let mut missing: Vec<String> = required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(PropError::MissingColumns {
            table: self.name.clone(),
            columns: missing,
        })
    }

    /// Iterate rows as header-addressable views.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().enumerate().map(move |(index, cells)| Row {
            table: self,
            index,
            cells,
        })
    }
}

/// One data row. Missing trailing cells read as empty.
#[derive(Debug, Clone, Copy)]
pub struct Row<'t> {
    table: &'t Table,
    index: usize,
    cells: &'t [String],
}

impl<'t> Row<'t> {
    /// 1-based data row number for error messages.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Trimmed cell value, empty when the column or cell is absent.
    pub fn get(&self, column: &str) -> &'t str {
        self.table
            .headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.cells.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    pub fn invalid(&self, column: &str) -> PropError {
        PropError::InvalidValue {
            table: self.table.name.clone(),
            row: self.number(),
            column: column.to_string(),
            value: self.get(column).to_string(),
        }
    }

    /// Optional float cell; non-numeric garbage is a structural error.
    pub fn optional_f64(&self, column: &str) -> Result<Option<f64>, PropError> {
        parse_optional_f64(self.get(column)).map_err(|_| self.invalid(column))
    }

    /// Required integer cell.
    pub fn integer(&self, column: &str) -> Result<i64, PropError> {
        parse_integer(self.get(column)).ok_or_else(|| self.invalid(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_headers() {
        assert_eq!(snake_case("Pass Yds SD"), "pass_yds_sd");
        assert_eq!(snake_case("  Player "), "player");
        assert_eq!(snake_case("price (american)"), "price_american");
        assert_eq!(snake_case("__id__"), "id");
        assert_eq!(snake_case("rec_yds"), "rec_yds");
    }

    #[test]
    fn test_null_cells() {
        for cell in ["", " ", "NaN", "nan", "NA", "None", "null"] {
            assert!(is_null_cell(cell), "{cell:?}");
        }
        assert!(!is_null_cell("0"));
    }

    #[test]
    fn test_parse_optional_f64() {
        assert_eq!(parse_optional_f64(" 12.5 "), Ok(Some(12.5)));
        assert_eq!(parse_optional_f64("nan"), Ok(None));
        assert_eq!(parse_optional_f64(""), Ok(None));
        assert_eq!(parse_optional_f64("twelve"), Err(()));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("2024"), Some(2024));
        assert_eq!(parse_integer("2024.0"), Some(2024));
        assert_eq!(parse_integer("3.5"), None);
        assert_eq!(parse_integer("x"), None);
    }

    #[test]
    fn test_table_from_reader() {
        let text = "Player,Team,Pass Yds\n\"Smith, Jr.\",KC,250\n,,\nJones,BUF\n";
        let table = Table::from_reader(text.as_bytes(), "projection").unwrap();
        assert_eq!(table.len(), 2);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("player"), "Smith, Jr.");
        assert_eq!(rows[0].get("pass_yds"), "250");
        assert_eq!(rows[1].get("pass_yds"), "");
        assert_eq!(rows[1].get("missing"), "");
        assert_eq!(rows[1].number(), 2);
    }

    #[test]
    fn test_require_columns_lists_sorted() {
        let table = Table::from_reader("player\nx\n".as_bytes(), "odds").unwrap();
        let err = table.require_columns(&["team", "player", "market"]).unwrap_err();
        match err {
            PropError::MissingColumns { table, columns } => {
                assert_eq!(table, "odds");
                assert_eq!(columns, vec!["market".to_string(), "team".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_csv_rejected() {
        let err = Table::read(Path::new("projections.xlsx"), "projection").unwrap_err();
        assert!(matches!(err, PropError::UnsupportedFormat(_)));
    }
}
