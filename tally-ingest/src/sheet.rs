//! Spreadsheet acquisition: xlsx/xls/xlsb/ods through calamine, csv through
//! the csv crate. The first worksheet with a non-empty first row is used and
//! that row is taken as the header.

use anyhow::Result;
use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;
use tally_core::ReportError;
use tracing::{debug, info};

use crate::types::{CellValue, RawTable};

/// Read the input spreadsheet into a [`RawTable`].
pub fn read_table(path: impl AsRef<Path>) -> Result<RawTable> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ReportError::InputNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let table = match ext.as_deref() {
        Some("csv") => read_csv(path),
        _ => read_workbook(path),
    }
    .map_err(|reason| ReportError::InputUnreadable {
        path: path.to_path_buf(),
        reason,
    })?;

    info!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "read input sheet"
    );
    Ok(table)
}

fn read_csv(path: &Path) -> Result<RawTable, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut table = RawTable {
        headers,
        rows: Vec::new(),
    };
    for result in rdr.records() {
        let record = result.map_err(|e| e.to_string())?;
        let cells = record
            .iter()
            .map(|s| {
                if s.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(s.to_string())
                }
            })
            .collect();
        table.push_positional(cells);
    }
    Ok(table)
}

fn read_workbook(path: &Path) -> Result<RawTable, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| e.to_string())?;
    let names = workbook.sheet_names().to_vec();

    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| format!("sheet '{name}': {e}"))?;
        let mut rows = range.rows();

        let Some(header_row) = rows.next() else {
            debug!(sheet = %name, "sheet is empty");
            continue;
        };
        let headers: Vec<String> = header_row.iter().map(header_text).collect();
        if headers.iter().all(String::is_empty) {
            debug!(sheet = %name, "sheet has no header row");
            continue;
        }

        debug!(sheet = %name, ?headers, "using sheet");
        let mut table = RawTable {
            headers,
            rows: Vec::new(),
        };
        for row in rows {
            table.push_positional(row.iter().map(cell_value).collect());
        }
        return Ok(table);
    }

    Ok(RawTable::default())
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if dt.is_datetime() => CellValue::DateTime(ndt),
            _ => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
