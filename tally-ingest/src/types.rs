use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A spreadsheet cell as read, before any interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Empty cells and whitespace-only text carry no value
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

/// Column name → cell for one data row. Names keep their original spelling;
/// lookups go through the normalizer's resolved column map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: HashMap<String, CellValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; the first value for a repeated column name is kept
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.entry(column.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_blank)
    }
}

/// Header plus data rows of the first usable sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Assemble from rows that may each carry different columns; the header
    /// is the union of column names in first-seen order.
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for row in &rows {
            let mut names: Vec<&str> = row.columns().collect();
            names.sort_unstable();
            for name in names {
                if !headers.iter().any(|h| h == name) {
                    headers.push(name.to_string());
                }
            }
        }
        Self { headers, rows }
    }

    /// Zip header names with positional cells
    pub fn push_positional(&mut self, cells: Vec<CellValue>) {
        let mut row = RawRow::new();
        for (header, cell) in self.headers.iter().zip(cells) {
            if header.is_empty() {
                continue;
            }
            row.insert(header.clone(), cell);
        }
        self.rows.push(row);
    }
}
