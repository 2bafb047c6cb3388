//! Document composer: lays out the report on A4 pages and serializes a PDF.
//!
//! Section order is fixed: title, narrative summary, product chart, product
//! table, month chart, month table. Charts never split; table rows flow onto
//! new pages with the header row repeated.

use chrono::NaiveDateTime;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use tally_core::{NumberFormat, SalesSummary};
use tracing::info;

use crate::chart::ChartImage;
use crate::error::RenderError;
use crate::font::{FONT_BOLD, FONT_REGULAR, Face, encode_win_ansi, fit_to_width, text_width};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
/// 20 mm
const MARGIN: f32 = 56.69;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const ROW_HEIGHT: f32 = 18.0;
const CELL_PADDING: f32 = 4.0;
const TABLE_FONT: f32 = 10.0;

const SECTION_HEADING: f32 = 14.0;

const PRODUCT_CHART: &str = "Chart1";
const MONTH_CHART: &str = "Chart2";

/// Document-level facts that do not come from the aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMeta {
    pub title: String,
    pub subtitle: Option<String>,
    pub generated_at: NaiveDateTime,
    /// Written to the PDF info dictionary
    pub producer: String,
    /// Rows the normalizer dropped
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

struct Column {
    title: &'static str,
    width: f32,
    align: Align,
}

#[derive(Debug, Clone, Copy)]
struct Rgb(f32, f32, f32);

const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
const GREY_TEXT: Rgb = Rgb(0.35, 0.35, 0.35);
const GRID: Rgb = Rgb(0.5, 0.5, 0.5);
const HEADER_FILL: Rgb = Rgb(0.941, 0.941, 0.941);

fn real(v: f32) -> Object {
    Object::Real(v)
}

/// Vertical space [`PageFlow::heading`] consumes
fn heading_height(size: f32) -> f32 {
    6.0 + size * 1.4 + 4.0
}

fn push_text(
    ops: &mut Vec<Operation>,
    x: f32,
    baseline: f32,
    text: &str,
    size: f32,
    face: Face,
    color: Rgb,
) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "rg",
        vec![real(color.0), real(color.1), real(color.2)],
    ));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(face.resource().as_bytes().to_vec()), real(size)],
    ));
    ops.push(Operation::new("Td", vec![real(x), real(baseline)]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Accumulates page content streams and tracks the vertical cursor
struct PageFlow {
    pages: Vec<Vec<Operation>>,
    /// Baseline cursor, PDF space (distance from the bottom edge)
    y: f32,
}

impl PageFlow {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        // pages is never empty
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn remaining(&self) -> f32 {
        self.y - MARGIN
    }

    /// Start a new page unless `height` still fits. Returns true on a break.
    fn ensure(&mut self, height: f32) -> bool {
        if height > self.remaining() && self.y < PAGE_HEIGHT - MARGIN {
            self.new_page();
            return true;
        }
        false
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn text_at(&mut self, x: f32, baseline: f32, text: &str, size: f32, face: Face, color: Rgb) {
        push_text(self.ops(), x, baseline, text, size, face, color);
    }

    /// One line of flowing text at the left margin, cut to the content width
    fn line(&mut self, text: &str, size: f32, face: Face, color: Rgb) {
        let leading = size * 1.4;
        self.ensure(leading);
        self.y -= leading;
        let text = fit_to_width(text, CONTENT_WIDTH, size, face);
        self.text_at(MARGIN, self.y + size * 0.25, &text, size, face, color);
    }

    fn heading(&mut self, text: &str, size: f32) {
        // keep a heading together with at least a table row below it
        self.ensure(heading_height(size) + ROW_HEIGHT * 2.0);
        self.gap(6.0);
        self.line(text, size, Face::Bold, BLACK);
        self.gap(4.0);
    }

    /// Section heading followed by a chart, never split across pages
    fn chart_section(&mut self, title: &str, name: &str, chart: &ChartImage) {
        self.ensure(heading_height(SECTION_HEADING) + chart.height);
        self.heading(title, SECTION_HEADING);
        self.chart(name, chart);
    }

    fn chart(&mut self, name: &str, chart: &ChartImage) {
        self.ensure(chart.height);
        self.y -= chart.height;
        let x = MARGIN + (CONTENT_WIDTH - chart.width).max(0.0) / 2.0;
        let y = self.y;
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![real(1.0), real(0.0), real(0.0), real(1.0), real(x), real(y)],
        ));
        ops.push(Operation::new(
            "Do",
            vec![Object::Name(name.as_bytes().to_vec())],
        ));
        ops.push(Operation::new("Q", vec![]));
        self.gap(8.0);
    }

    fn table(&mut self, columns: &[Column], rows: &[Vec<String>]) {
        self.ensure(ROW_HEIGHT * 2.0);
        self.table_row(columns, None, true);
        for row in rows {
            if self.ensure(ROW_HEIGHT) {
                self.table_row(columns, None, true);
            }
            self.table_row(columns, Some(row), false);
        }
        self.gap(10.0);
    }

    fn table_row(&mut self, columns: &[Column], cells: Option<&Vec<String>>, header: bool) {
        let top = self.y;
        let bottom = top - ROW_HEIGHT;
        let total_width: f32 = columns.iter().map(|c| c.width).sum();
        let face = if header { Face::Bold } else { Face::Regular };

        {
            let ops = self.ops();
            if header {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "rg",
                    vec![real(HEADER_FILL.0), real(HEADER_FILL.1), real(HEADER_FILL.2)],
                ));
                ops.push(Operation::new(
                    "re",
                    vec![real(MARGIN), real(bottom), real(total_width), real(ROW_HEIGHT)],
                ));
                ops.push(Operation::new("f", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }

            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "RG",
                vec![real(GRID.0), real(GRID.1), real(GRID.2)],
            ));
            ops.push(Operation::new("w", vec![real(0.25)]));
            let mut x = MARGIN;
            for col in columns {
                ops.push(Operation::new(
                    "re",
                    vec![real(x), real(bottom), real(col.width), real(ROW_HEIGHT)],
                ));
                x += col.width;
            }
            ops.push(Operation::new("S", vec![]));
            ops.push(Operation::new("Q", vec![]));
        }

        let baseline = bottom + (ROW_HEIGHT - TABLE_FONT) / 2.0 + 1.5;
        let mut x = MARGIN;
        for (i, col) in columns.iter().enumerate() {
            let raw = match cells {
                Some(cells) => cells.get(i).map(String::as_str).unwrap_or(""),
                None => col.title,
            };
            let avail = col.width - 2.0 * CELL_PADDING;
            let text = fit_to_width(raw, avail, TABLE_FONT, face);
            let tx = match col.align {
                Align::Left => x + CELL_PADDING,
                Align::Right => x + col.width - CELL_PADDING - text_width(&text, TABLE_FONT, face),
            };
            if !text.is_empty() {
                self.text_at(tx, baseline, &text, TABLE_FONT, face, BLACK);
            }
            x += col.width;
        }
        self.y = bottom;
    }
}

pub struct Composer {
    format: NumberFormat,
}

impl Composer {
    pub fn new(format: NumberFormat) -> Self {
        Self { format }
    }

    /// Lay out the full report and return the PDF bytes
    pub fn compose(
        &self,
        meta: &ReportMeta,
        summary: &SalesSummary,
        product_chart: &ChartImage,
        month_chart: &ChartImage,
    ) -> Result<Vec<u8>, RenderError> {
        let mut flow = PageFlow::new();

        flow.line(&meta.title, 20.0, Face::Bold, BLACK);
        if let Some(subtitle) = &meta.subtitle {
            flow.line(subtitle, 10.0, Face::Regular, GREY_TEXT);
        }
        let stamp = format!("Generated {}", meta.generated_at.format("%Y-%m-%d %H:%M:%S"));
        flow.line(&stamp, 10.0, Face::Regular, GREY_TEXT);
        flow.gap(6.0);

        flow.heading("Summary", SECTION_HEADING);
        for line in self.narrative(meta, summary) {
            flow.line(&line, 11.0, Face::Regular, BLACK);
        }
        flow.gap(6.0);

        flow.chart_section("Top products", PRODUCT_CHART, product_chart);
        flow.heading(
            &format!("Sales by product (top {})", summary.products.len()),
            12.0,
        );
        flow.table(&product_columns(), &self.product_rows(summary));

        flow.chart_section("Sales by month", MONTH_CHART, month_chart);
        flow.heading("Monthly totals", 12.0);
        flow.table(&month_columns(), &self.month_rows(summary));

        let page_count = flow.pages.len();
        for (i, ops) in flow.pages.iter_mut().enumerate() {
            let footer = format!("Page {} of {}", i + 1, page_count);
            let w = text_width(&footer, 9.0, Face::Regular);
            push_text(
                ops,
                (PAGE_WIDTH - w) / 2.0,
                MARGIN / 2.0,
                &footer,
                9.0,
                Face::Regular,
                GREY_TEXT,
            );
        }

        let bytes = assemble(meta, flow.pages, product_chart, month_chart)?;
        info!(pages = page_count, bytes = bytes.len(), "composed report document");
        Ok(bytes)
    }

    fn narrative(&self, meta: &ReportMeta, summary: &SalesSummary) -> Vec<String> {
        let mut lines = Vec::new();
        if summary.is_empty() {
            lines.push("No data: the input contained no usable sales records.".to_string());
        }
        lines.push(format!(
            "Total sales: {}",
            self.format.amount(summary.grand_total)
        ));
        let mut records = format!("Records: {}", summary.record_count);
        if meta.skipped_rows > 0 {
            records.push_str(&format!(", skipped rows: {}", meta.skipped_rows));
        }
        lines.push(records);
        lines.push(format!("Distinct products: {}", summary.distinct_products));
        match (summary.first_date, summary.last_date) {
            (Some(first), Some(last)) => lines.push(format!(
                "Period: {} to {} ({} months with sales)",
                first,
                last,
                summary.months.len()
            )),
            _ => lines.push("Period: no data".to_string()),
        }
        lines
    }

    fn product_rows(&self, summary: &SalesSummary) -> Vec<Vec<String>> {
        if summary.products.is_empty() {
            return vec![vec![String::new(), "No data".to_string(), String::new()]];
        }
        summary
            .products
            .iter()
            .map(|p| {
                vec![
                    p.rank.to_string(),
                    p.product.clone(),
                    self.format.amount(p.total_amount),
                ]
            })
            .collect()
    }

    fn month_rows(&self, summary: &SalesSummary) -> Vec<Vec<String>> {
        if summary.months.is_empty() {
            return vec![vec!["No data".to_string(), String::new()]];
        }
        summary
            .months
            .iter()
            .map(|m| vec![m.month.to_string(), self.format.amount(m.total_amount)])
            .collect()
    }
}

fn product_columns() -> [Column; 3] {
    [
        Column { title: "Rank", width: 45.0, align: Align::Right },
        Column { title: "Product", width: CONTENT_WIDTH - 45.0 - 120.0, align: Align::Left },
        Column { title: "Total", width: 120.0, align: Align::Right },
    ]
}

fn month_columns() -> [Column; 2] {
    [
        Column { title: "Month", width: CONTENT_WIDTH - 120.0, align: Align::Left },
        Column { title: "Total", width: 120.0, align: Align::Right },
    ]
}

/// PDF text string: plain literal for ASCII, UTF-16BE with BOM otherwise
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::string_literal(s);
    }
    let mut bytes = vec![0xfe, 0xff];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn font_resources(doc: &mut Document) -> Dictionary {
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    dictionary! {
        FONT_REGULAR => regular,
        FONT_BOLD => bold,
    }
}

fn chart_xobject(doc: &mut Document, chart: &ChartImage, fonts: &Dictionary) -> lopdf::ObjectId {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![real(0.0), real(0.0), real(chart.width), real(chart.height)],
        "Resources" => dictionary! { "Font" => fonts.clone() },
    };
    doc.add_object(Stream::new(dict, chart.content.clone()))
}

fn assemble(
    meta: &ReportMeta,
    pages: Vec<Vec<Operation>>,
    product_chart: &ChartImage,
    month_chart: &ChartImage,
) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let fonts = font_resources(&mut doc);
    let product_id = chart_xobject(&mut doc, product_chart, &fonts);
    let month_id = chart_xobject(&mut doc, month_chart, &fonts);
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => dictionary! {
            PRODUCT_CHART => product_id,
            MONTH_CHART => month_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }.encode()?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(&meta.title),
        "Producer" => text_string(&meta.producer),
        "CreationDate" => Object::string_literal(
            meta.generated_at.format("D:%Y%m%d%H%M%S").to_string()
        ),
    });
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartRenderer;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal::dec;
    use tally_core::{MonthSummary, ProductSummary, YearMonth};

    fn count(haystack: &[u8], needle: &str) -> usize {
        haystack
            .windows(needle.len())
            .filter(|w| *w == needle.as_bytes())
            .count()
    }

    fn meta() -> ReportMeta {
        ReportMeta {
            title: "Sales Report".into(),
            subtitle: Some("Source: sales.xlsx".into()),
            generated_at: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            producer: "tally test".into(),
            skipped_rows: 1,
        }
    }

    fn render(summary: &SalesSummary) -> Vec<u8> {
        let charts = ChartRenderer::new(NumberFormat::default());
        let shown = &summary.products[..summary.products.len().min(10)];
        let p = charts.product_chart(shown).unwrap();
        let m = charts.month_chart(&summary.months).unwrap();
        Composer::new(NumberFormat::default())
            .compose(&meta(), summary, &p, &m)
            .unwrap()
    }

    fn scenario() -> SalesSummary {
        SalesSummary {
            products: vec![
                ProductSummary { product: "Gadget".into(), total_amount: dec!(30), rank: 1 },
                ProductSummary { product: "Widget".into(), total_amount: dec!(25), rank: 2 },
            ],
            months: vec![
                MonthSummary { month: YearMonth::new(2024, 1).unwrap(), total_amount: dec!(25) },
                MonthSummary { month: YearMonth::new(2024, 2).unwrap(), total_amount: dec!(30) },
            ],
            record_count: 3,
            distinct_products: 2,
            grand_total: dec!(55),
            first_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            last_date: NaiveDate::from_ymd_opt(2024, 2, 1),
        }
    }

    fn pages(pdf: &[u8]) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|id| doc.get_page_content(*id).unwrap())
            .collect()
    }

    fn has(page: &[u8], needle: &str) -> bool {
        count(page, needle) > 0
    }

    fn position(page: &[u8], needle: &str) -> usize {
        page.windows(needle.len())
            .position(|w| w == needle.as_bytes())
            .unwrap_or_else(|| panic!("missing {needle}"))
    }

    /// Each chart heading sits on the same page as its chart
    fn assert_charts_keep_their_headings(pages: &[Vec<u8>]) {
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(
                has(page, "(Top products)"),
                has(page, "/Chart1 Do"),
                "page {}",
                i + 1
            );
            assert_eq!(
                has(page, "(Sales by month)"),
                has(page, "/Chart2 Do"),
                "page {}",
                i + 1
            );
        }
    }

    #[test]
    fn test_document_sections_in_order() {
        let pdf = render(&scenario());
        assert!(pdf.starts_with(b"%PDF-1.5"));

        // summary and product section fill the first page; the month section
        // does not fit below them and moves to the second as a whole
        let pages = pages(&pdf);
        assert_eq!(pages.len(), 2);
        assert_charts_keep_their_headings(&pages);

        let first = &pages[0];
        let title = position(first, "(Sales Report)");
        let total = position(first, "(Total sales: 55.00)");
        let chart1 = position(first, "/Chart1 Do");
        let gadget_row = position(first, "(30.00)");
        let widget_row = position(first, "(25.00)");
        assert!(title < total && total < chart1 && chart1 < gadget_row && gadget_row < widget_row);
        assert!(has(first, "(Records: 3, skipped rows: 1)"));
        assert!(has(first, "(Page 1 of 2)"));
        assert!(!has(first, "/Chart2 Do"));

        let second = &pages[1];
        let chart2 = position(second, "/Chart2 Do");
        let table = position(second, "(Monthly totals)");
        let jan = position(second, "(2024-01)");
        let feb = position(second, "(2024-02)");
        assert!(chart2 < table && table < jan && jan < feb);
        assert!(has(second, "(Page 2 of 2)"));
    }

    #[test]
    fn test_empty_summary_still_makes_a_document() {
        let pdf = render(&SalesSummary::default());
        let pages = pages(&pdf);
        assert_eq!(pages.len(), 2);
        assert_charts_keep_their_headings(&pages);
        assert!(has(&pages[1], "(Sales by month)"));
        assert_eq!(count(&pdf, "(No data: the input contained no usable sales records.)"), 1);
        assert_eq!(count(&pdf, "(Total sales: 0.00)"), 1);
        assert!(count(&pdf, "(No data)") >= 2);
    }

    #[test]
    fn test_long_title_is_cut_to_the_page_width() {
        let mut meta = meta();
        meta.title = "Quarterly ".repeat(20);
        let charts = ChartRenderer::new(NumberFormat::default());
        let summary = scenario();
        let pdf = Composer::new(NumberFormat::default())
            .compose(
                &meta,
                &summary,
                &charts.product_chart(&summary.products).unwrap(),
                &charts.month_chart(&summary.months).unwrap(),
            )
            .unwrap();

        let fitted = fit_to_width(&meta.title, CONTENT_WIDTH, 20.0, Face::Bold);
        assert!(fitted.ends_with('…'));
        assert!(text_width(&fitted, 20.0, Face::Bold) <= CONTENT_WIDTH);

        let pages = pages(&pdf);
        let first = &pages[0];
        let shown = fitted.trim_end_matches('…');
        assert!(has(first, &format!("({shown}")));
        assert!(!has(first, meta.title.trim_end()));
    }

    #[test]
    fn test_long_tables_flow_onto_new_pages() {
        let products: Vec<ProductSummary> = (0..80)
            .map(|i| ProductSummary {
                product: format!("Product {i:03}"),
                total_amount: Decimal::from(10_000 - i),
                rank: i as usize + 1,
            })
            .collect();
        let summary = SalesSummary {
            distinct_products: products.len(),
            record_count: products.len(),
            grand_total: products.iter().map(|p| p.total_amount).sum(),
            products,
            months: vec![MonthSummary {
                month: YearMonth::new(2024, 1).unwrap(),
                total_amount: dec!(1),
            }],
            first_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            last_date: NaiveDate::from_ymd_opt(2024, 1, 31),
        };

        let pdf = render(&summary);
        assert_charts_keep_their_headings(&pages(&pdf));
        let doc = Document::load_mem(&pdf).unwrap();
        let pages = doc.get_pages().len();
        assert!(pages >= 3, "expected table overflow, got {pages} pages");
        // header row repeated after every break inside the product table
        assert!(count(&pdf, "(Product)") >= 2);
        assert_eq!(count(&pdf, "(Product 079)"), 1);
        assert_eq!(count(&pdf, &format!("(Page {pages} of {pages})")), 1);

        // rows keep aggregator order
        let first = pdf.windows(13).position(|w| w == b"(Product 000)").unwrap();
        let last = pdf.windows(13).position(|w| w == b"(Product 079)").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_thousands_separators_in_tables() {
        let mut summary = scenario();
        summary.products[0].total_amount = dec!(1234567.891);
        let pdf = render(&summary);
        assert_eq!(count(&pdf, "(1,234,567.89)"), 1);
    }

    #[test]
    fn test_info_dictionary() {
        let pdf = render(&scenario());
        let doc = Document::load_mem(&pdf).unwrap();
        let info_ref = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_ref).unwrap();
        assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Sales Report");
        assert_eq!(
            info.get(b"CreationDate").unwrap().as_str().unwrap(),
            b"D:20250601093000"
        );
    }
}
