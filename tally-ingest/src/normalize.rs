//! Schema normalizer: maps heterogeneous sales sheets onto [`SaleRecord`]s.
//!
//! Header names are matched case-insensitively against an ordered alias table,
//! once per sheet. Per row, the first candidate column holding a value wins.
//! Rows that cannot produce a full (date, product, amount) triple are skipped
//! and counted, never fatal.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tally_core::{ReportError, SaleRecord, SkipReason, SkippedRow};
use tracing::{debug, info, warn};

use crate::parsers::{AmountParser, excel_serial_to_date, parse_date_text};
use crate::types::{CellValue, RawRow, RawTable};

/// Logical columns the normalizer looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Product,
    /// Sales value column, preferred over quantity × unit price
    Amount,
    Quantity,
    UnitPrice,
    /// Line total used only when quantity × unit price is unavailable
    LineTotal,
}

impl Field {
    /// Accepted header spellings, in priority order
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Date => &["date", "data"],
            Field::Product => &["product", "produto", "item"],
            Field::Amount => &["sales", "valor"],
            Field::Quantity => &["quantity", "qty", "quantidade"],
            Field::UnitPrice => &["price", "unit_price", "preço", "preco", "valor_unit"],
            Field::LineTotal => &["amount", "valor_total", "total"],
        }
    }
}

/// Header columns resolved for each [`Field`], best candidate first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    date: Vec<String>,
    product: Vec<String>,
    amount: Vec<String>,
    quantity: Vec<String>,
    unit_price: Vec<String>,
    line_total: Vec<String>,
}

impl ColumnMap {
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let pick = |field: Field| -> Vec<String> {
            let mut found = Vec::new();
            for alias in field.aliases() {
                for header in headers {
                    let header = header.as_ref();
                    if header.trim().to_lowercase() == *alias
                        && !found.iter().any(|f: &String| f == header)
                    {
                        found.push(header.to_string());
                    }
                }
            }
            found
        };

        Self {
            date: pick(Field::Date),
            product: pick(Field::Product),
            amount: pick(Field::Amount),
            quantity: pick(Field::Quantity),
            unit_price: pick(Field::UnitPrice),
            line_total: pick(Field::LineTotal),
        }
    }

    pub fn candidates(&self, field: Field) -> &[String] {
        match field {
            Field::Date => &self.date,
            Field::Product => &self.product,
            Field::Amount => &self.amount,
            Field::Quantity => &self.quantity,
            Field::UnitPrice => &self.unit_price,
            Field::LineTotal => &self.line_total,
        }
    }

    /// An amount can come from a sales column, quantity × unit price, or a line total
    pub fn has_amount_source(&self) -> bool {
        !self.amount.is_empty()
            || !self.line_total.is_empty()
            || (!self.quantity.is_empty() && !self.unit_price.is_empty())
    }

    /// Canonical fields with no usable column at all
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.date.is_empty() {
            out.push("date");
        }
        if self.product.is_empty() {
            out.push("product");
        }
        if !self.has_amount_source() {
            out.push("amount");
        }
        out
    }

    fn first_value<'r>(&self, field: Field, row: &'r RawRow) -> Option<&'r CellValue> {
        self.candidates(field)
            .iter()
            .filter_map(|col| row.get(col))
            .find(|cell| !cell.is_blank())
    }
}

/// Normalizer output: clean records in input order plus what was dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub records: Vec<SaleRecord>,
    pub skipped: Vec<SkippedRow>,
}

impl Normalized {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Skip tally per reason, for diagnostics
    pub fn skip_breakdown(&self) -> BTreeMap<&'static str, usize> {
        let mut out = BTreeMap::new();
        for s in &self.skipped {
            *out.entry(s.reason.as_str()).or_insert(0) += 1;
        }
        out
    }
}

pub struct Normalizer {
    columns: ColumnMap,
    amounts: AmountParser,
}

impl Normalizer {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        Ok(Self {
            columns: ColumnMap::resolve(headers),
            amounts: AmountParser::new()?,
        })
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Normalize one row, or say why it has to be skipped
    pub fn normalize_row(&self, row: &RawRow) -> Result<SaleRecord, SkipReason> {
        let date = self
            .columns
            .first_value(Field::Date, row)
            .ok_or(SkipReason::MissingDate)
            .and_then(cell_to_date)?;

        let product = self
            .columns
            .first_value(Field::Product, row)
            .and_then(cell_to_label)
            .ok_or(SkipReason::MissingProduct)?;

        let amount = self.row_amount(row)?;

        SaleRecord::new(date, product, amount).ok_or(SkipReason::InvalidAmount)
    }

    fn row_amount(&self, row: &RawRow) -> Result<Decimal, SkipReason> {
        if let Some(cell) = self.columns.first_value(Field::Amount, row) {
            return self.amounts.parse_cell(cell);
        }

        let qty = self.columns.first_value(Field::Quantity, row);
        let price = self.columns.first_value(Field::UnitPrice, row);
        if let (Some(q), Some(p)) = (qty, price) {
            let q = self.amounts.parse_cell(q)?;
            let p = self.amounts.parse_cell(p)?;
            return q.checked_mul(p).ok_or(SkipReason::InvalidAmount);
        }

        match self.columns.first_value(Field::LineTotal, row) {
            Some(cell) => self.amounts.parse_cell(cell),
            None => Err(SkipReason::MissingAmount),
        }
    }

    /// Normalize every non-blank row, preserving input order
    pub fn normalize_rows(&self, rows: &[RawRow]) -> Normalized {
        let mut out = Normalized::default();
        for (idx, row) in rows.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            match self.normalize_row(row) {
                Ok(record) => out.records.push(record),
                Err(reason) => {
                    debug!(row = idx + 1, %reason, "skipping row");
                    out.skipped.push(SkippedRow {
                        row: idx + 1,
                        reason,
                    });
                }
            }
        }

        if !out.skipped.is_empty() {
            warn!(
                skipped = out.skipped.len(),
                breakdown = ?out.skip_breakdown(),
                "rows skipped during normalization"
            );
        }
        out
    }
}

/// Normalize a whole sheet.
///
/// Fails with [`ReportError::NoResolvableColumns`] when the header cannot
/// supply a date, product, or amount, or when data rows exist but none of
/// them normalizes. A sheet with a usable header and no data rows is valid
/// and yields no records.
pub fn normalize_table(table: &RawTable) -> Result<Normalized> {
    let data_rows = table.rows.iter().filter(|r| !r.is_blank()).count();
    if table.headers.is_empty() && data_rows == 0 {
        info!("input sheet is empty");
        return Ok(Normalized::default());
    }

    let normalizer = Normalizer::new(&table.headers)?;
    let missing = normalizer.columns().missing();
    if !missing.is_empty() {
        return Err(ReportError::NoResolvableColumns {
            missing: format!("no column for {}", missing.join(", ")),
            rows: data_rows,
            skipped: data_rows,
        }
        .into());
    }

    let out = normalizer.normalize_rows(&table.rows);
    if out.records.is_empty() && data_rows > 0 {
        return Err(ReportError::NoResolvableColumns {
            missing: "no row yielded a complete date/product/amount".to_string(),
            rows: data_rows,
            skipped: out.skipped_count(),
        }
        .into());
    }

    info!(
        records = out.records.len(),
        skipped = out.skipped_count(),
        "normalized sales rows"
    );
    Ok(out)
}

fn cell_to_date(cell: &CellValue) -> Result<NaiveDate, SkipReason> {
    match cell {
        CellValue::Date(d) => Ok(*d),
        CellValue::DateTime(dt) => Ok(dt.date()),
        CellValue::Text(s) => parse_date_text(s).ok_or(SkipReason::UnparseableDate),
        CellValue::Float(f) => excel_serial_to_date(*f).ok_or(SkipReason::UnparseableDate),
        CellValue::Int(i) => excel_serial_to_date(*i as f64).ok_or(SkipReason::UnparseableDate),
        CellValue::Bool(_) => Err(SkipReason::UnparseableDate),
        CellValue::Empty => Err(SkipReason::MissingDate),
    }
}

fn cell_to_label(cell: &CellValue) -> Option<String> {
    let label = match cell {
        CellValue::Empty => return None,
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        CellValue::Float(f) => f.to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Date(d) => d.to_string(),
        CellValue::DateTime(dt) => dt.to_string(),
    };
    (!label.is_empty()).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mixed_rows() -> Vec<RawRow> {
        vec![
            RawRow::new()
                .with("data", "2024-01-05")
                .with("produto", "Widget")
                .with("preço", 10.0)
                .with("quantity", 2.0),
            RawRow::new()
                .with("date", "2024-01-20")
                .with("product", "Widget")
                .with("sales", 5.0),
            RawRow::new()
                .with("data", "2024-02-01")
                .with("produto", "Gadget")
                .with("sales", 30.0),
        ]
    }

    #[test]
    fn test_alias_resolution_is_case_insensitive_and_ordered() {
        let headers = vec!["Data", " DATE ", "Produto", "Qty", "Preço", "Valor"];
        let map = ColumnMap::resolve(&headers);
        assert_eq!(map.candidates(Field::Date), [" DATE ", "Data"]);
        assert_eq!(map.candidates(Field::Product), ["Produto"]);
        assert_eq!(map.candidates(Field::Amount), ["Valor"]);
        assert_eq!(map.candidates(Field::Quantity), ["Qty"]);
        assert_eq!(map.candidates(Field::UnitPrice), ["Preço"]);
        assert!(map.missing().is_empty());
    }

    #[test]
    fn test_missing_fields_reported() {
        let map = ColumnMap::resolve(&["when", "product", "quantity"]);
        assert_eq!(map.missing(), vec!["date", "amount"]);
    }

    #[test]
    fn test_mixed_schema_rows() {
        let table = RawTable::from_rows(mixed_rows());
        let out = normalize_table(&table).unwrap();
        assert_eq!(out.skipped_count(), 0);
        assert_eq!(
            out.records,
            vec![
                SaleRecord::new(ymd(2024, 1, 5), "Widget", dec!(20)).unwrap(),
                SaleRecord::new(ymd(2024, 1, 20), "Widget", dec!(5)).unwrap(),
                SaleRecord::new(ymd(2024, 2, 1), "Gadget", dec!(30)).unwrap(),
            ]
        );
    }

    #[test]
    fn test_bad_rows_are_skipped_and_counted() {
        let mut rows = mixed_rows();
        rows.push(
            RawRow::new()
                .with("date", "someday")
                .with("product", "Widget")
                .with("sales", 100.0),
        );
        rows.push(
            RawRow::new()
                .with("date", "2024-03-01")
                .with("product", "Widget")
                .with("sales", -4.0),
        );
        rows.push(RawRow::new().with("date", "2024-03-02").with("sales", 4.0));
        rows.push(RawRow::new().with("date", "2024-03-03").with("product", "Gizmo"));

        let out = normalize_table(&RawTable::from_rows(rows)).unwrap();
        assert_eq!(out.records.len(), 3);
        assert_eq!(
            out.skipped,
            vec![
                SkippedRow { row: 4, reason: SkipReason::UnparseableDate },
                SkippedRow { row: 5, reason: SkipReason::NegativeAmount },
                SkippedRow { row: 6, reason: SkipReason::MissingProduct },
                SkippedRow { row: 7, reason: SkipReason::MissingAmount },
            ]
        );
        let total: Decimal = out.records.iter().map(|r| r.amount).sum();
        assert_eq!(total, dec!(55));
    }

    #[test]
    fn test_total_column_beats_quantity_times_price() {
        let n = Normalizer::new(&["date", "product", "quantity", "price", "sales"]).unwrap();
        let row = RawRow::new()
            .with("date", "2025-01-05")
            .with("product", "Camiseta")
            .with("quantity", 3.0)
            .with("price", 49.9)
            .with("sales", 100.0);
        assert_eq!(n.normalize_row(&row).unwrap().amount, dec!(100));

        let row = RawRow::new()
            .with("date", "2025-01-05")
            .with("product", "Camiseta")
            .with("quantity", 3.0)
            .with("price", 49.9)
            .with("sales", "");
        assert_eq!(n.normalize_row(&row).unwrap().amount, dec!(149.7));
    }

    #[test]
    fn test_quantity_times_price_beats_line_total() {
        let n = Normalizer::new(&["date", "product", "qty", "price", "total"]).unwrap();
        let row = RawRow::new()
            .with("date", "2025-02-10")
            .with("product", "Bermuda")
            .with("qty", 2.0)
            .with("price", 80.0)
            .with("total", 150.0);
        assert_eq!(n.normalize_row(&row).unwrap().amount, dec!(160));

        // falls back to the line total when a factor is blank
        let row = RawRow::new()
            .with("date", "2025-02-10")
            .with("product", "Bermuda")
            .with("qty", 2.0)
            .with("price", "")
            .with("total", 150.0);
        assert_eq!(n.normalize_row(&row).unwrap().amount, dec!(150));
    }

    #[test]
    fn test_line_total_alone_is_an_amount_source() {
        let map = ColumnMap::resolve(&["date", "product", "valor_total"]);
        assert_eq!(map.candidates(Field::LineTotal), ["valor_total"]);
        assert!(map.missing().is_empty());
    }

    #[test]
    fn test_native_cells_and_numeric_labels() {
        let n = Normalizer::new(&["date", "item", "amount"]).unwrap();
        let row = RawRow::new()
            .with("date", CellValue::Float(45296.0))
            .with("item", CellValue::Float(1042.0))
            .with("amount", CellValue::Int(7));
        let rec = n.normalize_row(&row).unwrap();
        assert_eq!(rec.date, ymd(2024, 1, 5));
        assert_eq!(rec.product, "1042");
        assert_eq!(rec.amount, dec!(7));
    }

    #[test]
    fn test_renormalizing_canonical_rows_is_identity() {
        let first = normalize_table(&RawTable::from_rows(mixed_rows())).unwrap();
        let canonical: Vec<RawRow> = first
            .records
            .iter()
            .map(|r| {
                RawRow::new()
                    .with("date", r.date.to_string().as_str())
                    .with("product", r.product.as_str())
                    .with("amount", r.amount.to_string().as_str())
            })
            .collect();
        let second = normalize_table(&RawTable::from_rows(canonical)).unwrap();
        assert_eq!(second.records, first.records);
        assert!(second.skipped.is_empty());
    }

    #[test]
    fn test_header_without_amount_is_schema_error() {
        let table = RawTable {
            headers: vec!["date".into(), "product".into()],
            rows: vec![RawRow::new().with("date", "2024-01-01").with("product", "A")],
        };
        let err = normalize_table(&table).unwrap_err();
        match err.downcast_ref::<ReportError>() {
            Some(ReportError::NoResolvableColumns { missing, rows, .. }) => {
                assert!(missing.contains("amount"));
                assert_eq!(*rows, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_all_rows_unusable_is_schema_error() {
        let table = RawTable::from_rows(vec![
            RawRow::new().with("date", "??").with("product", "A").with("sales", 1.0),
        ]);
        let err = normalize_table(&table).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::NoResolvableColumns { skipped: 1, .. })
        ));
    }

    #[test]
    fn test_header_only_sheet_is_valid_and_empty() {
        let table = RawTable {
            headers: vec!["date".into(), "product".into(), "sales".into()],
            rows: vec![RawRow::new().with("date", "").with("product", "")],
        };
        let out = normalize_table(&table).unwrap();
        assert!(out.records.is_empty());
        assert!(out.skipped.is_empty());

        let out = normalize_table(&RawTable::default()).unwrap();
        assert!(out.records.is_empty());
    }
}
