//! Delimited-text ingest.
//!
//! This module is responsible for turning a lab measurement export into named
//! numeric columns that are safe to convert and fit.
//!
//! Design goals:
//! - **Delimiter auto-detection** (comma, semicolon, tab, pipe)
//! - **Lenient header matching**: names are compared after trimming whitespace
//!   and a UTF-8 BOM, so `" Druck (hPa) "` matches `Druck (hPa)`
//! - **Strict values**: a missing column or a non-numeric cell aborts the run
//!   with exit code 2 and the offending line

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info};

use crate::error::AppError;

/// Delimiters considered by the sniffer, in order of preference on ties.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// A loaded table: trimmed headers plus raw records.
#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    pub delimiter: u8,
    headers: Vec<String>,
    header_map: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse a named column as `f64` values.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, AppError> {
        let idx = *self.header_map.get(name.trim()).ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Missing required column `{name}` in '{}' (found: {})",
                    self.path.display(),
                    self.headers.join(", ")
                ),
            )
        })?;

        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                // +2: header line plus 1-based numbering.
                let line = row + 2;
                let cell = record.get(idx).map(str::trim).unwrap_or("");
                parse_number(cell).ok_or_else(|| {
                    AppError::new(
                        2,
                        format!("Invalid numeric value '{cell}' in column `{name}` (line {line})"),
                    )
                })
            })
            .collect()
    }
}

/// Load a delimited file, sniffing its delimiter.
pub fn load_table(path: &Path) -> Result<Table, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Error loading file '{}': {e}", path.display())))?;
    let table = parse_table(path, &text)?;
    info!(
        path = %path.display(),
        rows = table.len(),
        delimiter = %char::from(table.delimiter).escape_default(),
        "Successfully loaded"
    );
    Ok(table)
}

/// Parse already-read text (split out for testing).
pub fn parse_table(path: &Path, text: &str) -> Result<Table, AppError> {
    let delimiter = sniff_delimiter(text);
    debug!(delimiter = %char::from(delimiter).escape_default(), "sniffed delimiter");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read headers of '{}': {e}", path.display())))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let header_map = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), idx))
        .collect();

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::new(2, format!("CSV parse error in '{}' (line {}): {e}", path.display(), idx + 2))
        })?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(AppError::new(3, format!("No data rows in '{}'.", path.display())));
    }

    Ok(Table {
        path: path.to_path_buf(),
        delimiter,
        headers,
        header_map,
        records,
    })
}

/// Pick the delimiter that splits the header and the first data line into the
/// same (largest) number of fields. Falls back to `,`.
pub fn sniff_delimiter(text: &str) -> u8 {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return b',';
    };
    let first_row = lines.next();

    let mut best: Option<(u8, usize)> = None;
    for &d in &CANDIDATE_DELIMITERS {
        let count = header.bytes().filter(|&b| b == d).count();
        if count == 0 {
            continue;
        }
        if let Some(row) = first_row {
            if row.bytes().filter(|&b| b == d).count() != count {
                continue;
            }
        }
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((d, count));
        }
    }

    best.map_or(b',', |(d, _)| d)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim_start_matches('\u{feff}').trim().to_string()
}

fn parse_number(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolon_and_tab() {
        assert_eq!(sniff_delimiter("Temperatur (C);Druck (hPa)\n20.1;1013\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3\n"), b'\t');
        assert_eq!(sniff_delimiter("a,b\n1,2\n"), b',');
    }

    #[test]
    fn sniffer_requires_consistent_counts() {
        // The header contains a comma inside a name, but only `;` splits both lines evenly.
        assert_eq!(sniff_delimiter("x, raw;y\n1;2\n"), b';');
    }

    #[test]
    fn headers_are_trimmed_and_bom_stripped() {
        let text = "\u{feff} Temperatur (C) ; Druck (hPa) \n 0 ; 1000\n10;1040\n";
        let table = parse_table(Path::new("mem.csv"), text).unwrap();
        assert_eq!(table.headers(), &["Temperatur (C)", "Druck (hPa)"]);
        assert_eq!(table.column("Druck (hPa)").unwrap(), vec![1000.0, 1040.0]);
        assert_eq!(table.column("Temperatur (C)").unwrap(), vec![0.0, 10.0]);
    }

    #[test]
    fn missing_column_is_input_error() {
        let table = parse_table(Path::new("mem.csv"), "a,b\n1,2\n").unwrap();
        let err = table.column("c").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("`c`"));
    }

    #[test]
    fn non_numeric_cell_reports_line() {
        let table = parse_table(Path::new("mem.csv"), "a,b\n1,2\n3,x\n").unwrap();
        let err = table.column("b").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("line 3"), "{}", err.message());
    }

    #[test]
    fn empty_body_is_no_data() {
        let err = parse_table(Path::new("mem.csv"), "a,b\n\n").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn missing_file_is_load_failure() {
        let err = load_table(Path::new("definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().starts_with("Error loading file"));
    }
}
