//! Chart renderer: top-products bar chart and monthly line chart.
//!
//! Each chart is drawn with plotters onto [`PdfBackend`] and comes back as a
//! [`ChartImage`]: an owned buffer holding a PDF content stream in point
//! units, ready to be wrapped as a form XObject by the composer.

use lopdf::content::{Content, Operation};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tally_core::{MonthSummary, NumberFormat, ProductSummary};
use tracing::debug;

use crate::backend::PdfBackend;
use crate::error::RenderError;
use crate::font::{Face, text_width};

const FONT: &str = "sans-serif";
const BAR_COLOR: RGBColor = RGBColor(0x7c, 0x5c, 0xff);
const LINE_COLOR: RGBColor = RGBColor(0x00, 0xaa, 0xff);
const MUTED: RGBColor = RGBColor(0x80, 0x80, 0x80);

/// Roughly 160 × 90 mm
pub const PRODUCT_CHART_SIZE: (u32, u32) = (454, 255);
/// Roughly 160 × 70 mm
pub const MONTH_CHART_SIZE: (u32, u32) = (454, 198);

/// A rendered vector chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
    /// PDF content stream drawing the chart in `[0, width] × [0, height]`
    pub content: Vec<u8>,
}

impl ChartImage {
    fn from_ops(size: (u32, u32), ops: Vec<Operation>) -> Result<Self, RenderError> {
        let content = Content { operations: ops }.encode()?;
        Ok(Self {
            width: size.0 as f32,
            height: size.1 as f32,
            content,
        })
    }
}

pub struct ChartRenderer {
    format: NumberFormat,
}

impl ChartRenderer {
    pub fn new(format: NumberFormat) -> Self {
        Self { format }
    }

    /// Horizontal bars, rank 1 at the top
    pub fn product_chart(&self, products: &[ProductSummary]) -> Result<ChartImage, RenderError> {
        let size = PRODUCT_CHART_SIZE;
        let caption = format!("Top {} products by sales", products.len());
        let mut ops = Vec::new();
        {
            let root = PdfBackend::new(&mut ops, size).into_drawing_area();
            root.fill(&WHITE)?;

            if products.is_empty() {
                draw_no_data(&root, &caption)?;
            } else {
                let n = products.len();
                // plotters puts segment 0 at the bottom, so walk the ranking backwards
                let labels: Vec<&str> = products.iter().rev().map(|p| p.product.as_str()).collect();
                let x_max = axis_max(products.iter().map(|p| p.total_amount));
                let label_area = labels
                    .iter()
                    .map(|l| text_width(l, 10.0, Face::Regular))
                    .fold(0.0f32, f32::max)
                    .clamp(30.0, 160.0) as u32
                    + 10;

                let fmt = self.format;
                let mut chart = ChartBuilder::on(&root)
                    .caption(&caption, (FONT, 14).into_font().style(FontStyle::Bold))
                    .margin(10)
                    .x_label_area_size(35)
                    .y_label_area_size(label_area)
                    .build_cartesian_2d(0f64..x_max, (0usize..n).into_segmented())?;

                chart
                    .configure_mesh()
                    .disable_y_mesh()
                    .y_labels(n + 1)
                    .y_label_formatter(&|v: &SegmentValue<usize>| match v {
                        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                            labels.get(*i).map(|s| s.to_string()).unwrap_or_default()
                        }
                        SegmentValue::Last => String::new(),
                    })
                    .x_labels(6)
                    .x_label_formatter(&|v: &f64| fmt.axis(*v))
                    .x_desc("Sales")
                    .label_style((FONT, 10))
                    .axis_desc_style((FONT, 11))
                    .draw()?;

                chart.draw_series(
                    Histogram::horizontal(&chart)
                        .style(BAR_COLOR.mix(0.9).filled())
                        .margin(4)
                        .data(
                            products
                                .iter()
                                .rev()
                                .enumerate()
                                .map(|(i, p)| (i, to_f64(p.total_amount))),
                        ),
                )?;
            }
            root.present()?;
        }

        debug!(products = products.len(), ops = ops.len(), "rendered product chart");
        ChartImage::from_ops(size, ops)
    }

    /// Line with point markers, one point per month, oldest on the left
    pub fn month_chart(&self, months: &[MonthSummary]) -> Result<ChartImage, RenderError> {
        let size = MONTH_CHART_SIZE;
        let caption = "Sales by month";
        let mut ops = Vec::new();
        {
            let root = PdfBackend::new(&mut ops, size).into_drawing_area();
            root.fill(&WHITE)?;

            if months.is_empty() {
                draw_no_data(&root, caption)?;
            } else {
                let n = months.len();
                let labels: Vec<String> = months.iter().map(|m| m.month.short_label()).collect();
                let y_max = axis_max(months.iter().map(|m| m.total_amount));
                let fmt = self.format;

                let mut chart = ChartBuilder::on(&root)
                    .caption(caption, (FONT, 14).into_font().style(FontStyle::Bold))
                    .margin(10)
                    .x_label_area_size(30)
                    .y_label_area_size(60)
                    .build_cartesian_2d((0usize..n).into_segmented(), 0f64..y_max)?;

                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_labels((n + 1).min(13))
                    .x_label_formatter(&|v: &SegmentValue<usize>| match v {
                        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                            labels.get(*i).cloned().unwrap_or_default()
                        }
                        SegmentValue::Last => String::new(),
                    })
                    .y_labels(6)
                    .y_label_formatter(&|v: &f64| fmt.axis(*v))
                    .y_desc("Sales")
                    .label_style((FONT, 10))
                    .axis_desc_style((FONT, 11))
                    .draw()?;

                let points: Vec<(SegmentValue<usize>, f64)> = months
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (SegmentValue::CenterOf(i), to_f64(m.total_amount)))
                    .collect();

                chart.draw_series(LineSeries::new(
                    points.clone(),
                    LINE_COLOR.stroke_width(2),
                ))?;
                chart.draw_series(
                    points
                        .into_iter()
                        .map(|p| Circle::new(p, 3, LINE_COLOR.filled())),
                )?;
            }
            root.present()?;
        }

        debug!(months = months.len(), ops = ops.len(), "rendered month chart");
        ChartImage::from_ops(size, ops)
    }
}

fn draw_no_data(
    root: &DrawingArea<PdfBackend<'_>, Shift>,
    caption: &str,
) -> Result<(), RenderError> {
    let body = root.titled(caption, (FONT, 14).into_font().style(FontStyle::Bold))?;
    let (w, h) = body.dim_in_pixel();
    let style = (FONT, 12)
        .into_font()
        .color(&MUTED)
        .pos(Pos::new(HPos::Center, VPos::Center));
    body.draw_text("No data", &style, (w as i32 / 2, h as i32 / 2))?;
    Ok(())
}

fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

/// Value-axis upper bound with headroom; never a zero-width range
fn axis_max(values: impl Iterator<Item = Decimal>) -> f64 {
    let max = values.map(to_f64).fold(0.0, f64::max);
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;
    use tally_core::YearMonth;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    fn products() -> Vec<ProductSummary> {
        vec![
            ProductSummary { product: "Gadget".into(), total_amount: dec!(30), rank: 1 },
            ProductSummary { product: "Widget".into(), total_amount: dec!(25), rank: 2 },
        ]
    }

    #[test]
    fn test_product_chart_labels_and_caption() {
        let chart = ChartRenderer::new(NumberFormat::default())
            .product_chart(&products())
            .unwrap();
        assert_eq!((chart.width, chart.height), (454.0, 255.0));
        assert!(contains(&chart.content, "(Gadget)"));
        assert!(contains(&chart.content, "(Widget)"));
        assert!(contains(&chart.content, "(Top 2 products by sales)"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let r = ChartRenderer::new(NumberFormat::default());
        assert_eq!(r.product_chart(&products()).unwrap(), r.product_chart(&products()).unwrap());
    }

    #[test]
    fn test_month_chart_single_point() {
        let months = vec![MonthSummary {
            month: YearMonth::new(2024, 1).unwrap(),
            total_amount: dec!(1234.5),
        }];
        let chart = ChartRenderer::new(NumberFormat::default())
            .month_chart(&months)
            .unwrap();
        assert!(contains(&chart.content, "(Jan 2024)"));
        assert!(contains(&chart.content, "(Sales by month)"));
    }

    #[test]
    fn test_empty_charts_still_render() {
        let r = ChartRenderer::new(NumberFormat::default());
        let p = r.product_chart(&[]).unwrap();
        let m = r.month_chart(&[]).unwrap();
        assert!(contains(&p.content, "(No data)"));
        assert!(contains(&m.content, "(No data)"));
    }

    #[test]
    fn test_zero_valued_product_renders() {
        let zero = vec![ProductSummary { product: "Free".into(), total_amount: dec!(0), rank: 1 }];
        let chart = ChartRenderer::new(NumberFormat::default())
            .product_chart(&zero)
            .unwrap();
        assert!(contains(&chart.content, "(Free)"));
    }
}
