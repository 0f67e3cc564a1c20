use std::io::Cursor;

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rust_xlsxwriter::{Format, Image as XlsxImage, Workbook, Worksheet};

use crate::errors::CoreError;
use crate::models::chart::ChartKind;
use crate::models::record::TransactionRecord;
use crate::render::common::truncate_label;
use crate::render::raster::Rasterizer;
use crate::render::scene::Surface;

/// Column headers shared by every tabular export.
pub const RECORD_COLUMNS: [&str; 8] = [
    "Date",
    "Product",
    "Category",
    "Store",
    "Customer",
    "Units Sold",
    "Revenue",
    "Profit",
];

pub const RAW_DATA_SHEET: &str = "Raw Data";
pub const VISUALS_SHEET: &str = "Visuals";

// A4 portrait, millimetres.
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const PAGE_MARGIN_MM: f32 = 15.0;
const CHART_WIDTH_MM: f32 = 180.0;
const TABLE_ROW_MM: f32 = 5.0;
/// Left edge of each appendix column, mm.
const TABLE_COLUMNS_MM: [f32; 8] = [15.0, 37.0, 67.0, 92.0, 117.0, 142.0, 160.0, 180.0];
const TABLE_COLUMN_CHARS: [usize; 8] = [11, 15, 12, 12, 12, 8, 9, 9];

/// Default Excel row height in pixels.
const XLSX_ROW_PX: f64 = 20.0;

/// Vector snapshot of one rendered chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSnapshot {
    pub kind: ChartKind,
    pub caption: String,
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

impl ChartSnapshot {
    pub fn from_surface(kind: ChartKind, surface: &Surface) -> Self {
        Self {
            kind,
            caption: kind.title().to_string(),
            svg: surface.to_svg(),
            width: surface.width().round().max(1.0) as u32,
            height: surface.height().round().max(1.0) as u32,
        }
    }
}

/// Raster image of a chart, or why it could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedChart {
    pub kind: ChartKind,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    pub png: Result<Vec<u8>, String>,
}

impl RasterizedChart {
    /// Text written in place of the image when rasterization failed.
    #[must_use]
    pub fn error_placeholder(&self) -> Option<String> {
        self.png.as_ref().err().map(|e| format!("Chart error: {e}"))
    }
}

/// Serializes the filtered view and chart images into downloadable artifacts.
pub struct ExportService;

impl ExportService {
    pub fn new() -> Self {
        Self
    }

    /// Rasterize charts one after another. A failing chart is logged and
    /// carried as an error entry; the remaining charts still rasterize.
    pub fn rasterize_all(&self, charts: &[ChartSnapshot], rasterizer: &dyn Rasterizer) -> Vec<RasterizedChart> {
        charts
            .iter()
            .map(|chart| {
                let png = self.to_png(chart, rasterizer).map_err(|e| {
                    tracing::warn!(chart = %chart.kind, error = %e, "chart rasterization failed");
                    e.to_string()
                });
                RasterizedChart {
                    kind: chart.kind,
                    caption: chart.caption.clone(),
                    width: chart.width,
                    height: chart.height,
                    png,
                }
            })
            .collect()
    }

    // ── CSV ─────────────────────────────────────────────────────────

    /// Filtered records as CSV text with a header row.
    ///
    /// Fields containing commas, quotes or newlines are quoted, with inner
    /// quotes doubled.
    #[must_use]
    pub fn to_csv(&self, records: &[&TransactionRecord]) -> String {
        let mut out = String::new();
        out.push_str(&RECORD_COLUMNS.join(","));
        out.push('\n');
        for r in records {
            let row = [
                csv_field(&r.date),
                csv_field(&r.product),
                csv_field(&r.category),
                csv_field(&r.store_name),
                csv_field(&r.customer_name),
                r.units_sold.to_string(),
                r.revenue.to_string(),
                r.profit.to_string(),
            ];
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    // ── XLSX ────────────────────────────────────────────────────────

    /// Workbook with a `Raw Data` sheet and a `Visuals` sheet of captioned
    /// chart images.
    pub fn to_xlsx(
        &self,
        records: &[&TransactionRecord],
        charts: &[ChartSnapshot],
        rasterizer: &dyn Rasterizer,
    ) -> Result<Vec<u8>, CoreError> {
        let rasterized = self.rasterize_all(charts, rasterizer);
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.raw_data_sheet(records)?);
        workbook.push_worksheet(self.visuals_sheet(&rasterized)?);

        let buffer = workbook.save_to_buffer()?;
        tracing::info!(rows = records.len(), charts = charts.len(), bytes = buffer.len(), "exported spreadsheet");
        Ok(buffer)
    }

    fn raw_data_sheet(&self, records: &[&TransactionRecord]) -> Result<Worksheet, CoreError> {
        let header = Format::new().set_bold();
        let mut sheet = Worksheet::new();
        sheet.set_name(RAW_DATA_SHEET)?;

        for (col, title) in RECORD_COLUMNS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &header)?;
            sheet.set_column_width(col as u16, 14)?;
        }
        for (i, r) in records.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, &r.date)?;
            sheet.write_string(row, 1, &r.product)?;
            sheet.write_string(row, 2, &r.category)?;
            sheet.write_string(row, 3, &r.store_name)?;
            sheet.write_string(row, 4, &r.customer_name)?;
            sheet.write_number(row, 5, r.units_sold)?;
            sheet.write_number(row, 6, r.revenue)?;
            sheet.write_number(row, 7, r.profit)?;
        }
        Ok(sheet)
    }

    fn visuals_sheet(&self, charts: &[RasterizedChart]) -> Result<Worksheet, CoreError> {
        let caption = Format::new().set_bold();
        let mut sheet = Worksheet::new();
        sheet.set_name(VISUALS_SHEET)?;

        let mut row: u32 = 0;
        for chart in charts {
            sheet.write_string_with_format(row, 0, &chart.caption, &caption)?;
            row += 1;
            match &chart.png {
                Ok(png) => {
                    let image = XlsxImage::new_from_buffer(png)?;
                    sheet.insert_image(row, 0, &image)?;
                    row += (f64::from(chart.height) / XLSX_ROW_PX).ceil() as u32 + 2;
                }
                Err(_) => {
                    let text = chart.error_placeholder().unwrap_or_default();
                    sheet.write_string(row, 0, &text)?;
                    row += 2;
                }
            }
        }
        Ok(sheet)
    }

    // ── PDF ─────────────────────────────────────────────────────────

    /// A4 document: title, each chart with its caption, then a paginated
    /// table of the filtered records.
    pub fn to_pdf(
        &self,
        title: &str,
        records: &[&TransactionRecord],
        charts: &[ChartSnapshot],
        rasterizer: &dyn Rasterizer,
    ) -> Result<Vec<u8>, CoreError> {
        let rasterized = self.rasterize_all(charts, rasterizer);

        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

        let mut current = doc.get_page(page).get_layer(layer);
        let mut y = PAGE_HEIGHT_MM - PAGE_MARGIN_MM;
        current.use_text(title, 18.0, Mm(PAGE_MARGIN_MM), Mm(y), &bold);
        y -= 12.0;

        let new_page = || {
            let (p, l) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(p).get_layer(l)
        };

        for chart in &rasterized {
            let height_mm = CHART_WIDTH_MM * chart.height as f32 / chart.width.max(1) as f32;
            let block = match chart.png {
                Ok(_) => height_mm + 10.0,
                Err(_) => 16.0,
            };
            if y - block < PAGE_MARGIN_MM {
                current = new_page();
                y = PAGE_HEIGHT_MM - PAGE_MARGIN_MM;
            }
            current.use_text(chart.caption.as_str(), 12.0, Mm(PAGE_MARGIN_MM), Mm(y), &bold);
            y -= 4.0;
            match &chart.png {
                Ok(png) => {
                    y -= height_mm;
                    if let Err(e) = place_png(&current, png, chart.width, PAGE_MARGIN_MM, y) {
                        tracing::warn!(chart = %chart.kind, error = %e, "could not embed chart image");
                        let text = format!("Chart error: {e}");
                        current.use_text(text, 10.0, Mm(PAGE_MARGIN_MM), Mm(y + height_mm - 6.0), &regular);
                    }
                    y -= 6.0;
                }
                Err(_) => {
                    y -= 6.0;
                    let text = chart.error_placeholder().unwrap_or_default();
                    current.use_text(text, 10.0, Mm(PAGE_MARGIN_MM), Mm(y), &regular);
                    y -= 6.0;
                }
            }
        }

        // Appendix always starts on a fresh page.
        current = new_page();
        y = PAGE_HEIGHT_MM - PAGE_MARGIN_MM;
        current.use_text("Data", 14.0, Mm(PAGE_MARGIN_MM), Mm(y), &bold);
        y -= 8.0;
        write_table_header(&current, &bold, y);
        y -= TABLE_ROW_MM;

        for r in records {
            if y < PAGE_MARGIN_MM {
                current = new_page();
                y = PAGE_HEIGHT_MM - PAGE_MARGIN_MM;
                write_table_header(&current, &bold, y);
                y -= TABLE_ROW_MM;
            }
            let cells = [
                r.date_key(),
                r.product.clone(),
                r.category.clone(),
                r.store_name.clone(),
                r.customer_name.clone(),
                format_amount(r.units_sold),
                format_amount(r.revenue),
                format_amount(r.profit),
            ];
            for (i, cell) in cells.iter().enumerate() {
                let text = truncate_label(cell, TABLE_COLUMN_CHARS[i]).unwrap_or_default();
                current.use_text(text, 8.0, Mm(TABLE_COLUMNS_MM[i]), Mm(y), &regular);
            }
            y -= TABLE_ROW_MM;
        }

        let bytes = doc.save_to_bytes()?;
        tracing::info!(rows = records.len(), charts = charts.len(), bytes = bytes.len(), "exported document");
        Ok(bytes)
    }

    /// PNG of a single chart, e.g. for an email attachment.
    pub fn to_png(&self, chart: &ChartSnapshot, rasterizer: &dyn Rasterizer) -> Result<Vec<u8>, CoreError> {
        rasterizer
            .rasterize(&chart.svg, chart.width, chart.height)
            .map_err(|e| match e {
                CoreError::Rasterization { message, .. } => CoreError::Rasterization {
                    chart: chart.kind.to_string(),
                    message,
                },
                other => other,
            })
    }
}

impl Default for ExportService {
    fn default() -> Self {
        Self::new()
    }
}

fn write_table_header(layer: &PdfLayerReference, font: &IndirectFontRef, y: f32) {
    for (i, title) in RECORD_COLUMNS.iter().enumerate() {
        layer.use_text(*title, 8.0, Mm(TABLE_COLUMNS_MM[i]), Mm(y), font);
    }
}

/// Embed a PNG so that it is `CHART_WIDTH_MM` wide with its bottom-left at `(x, y)`.
fn place_png(layer: &PdfLayerReference, png: &[u8], width_px: u32, x: f32, y: f32) -> Result<(), CoreError> {
    let decoder = PngDecoder::new(Cursor::new(png)).map_err(|e| CoreError::Export(e.to_string()))?;
    let image = Image::try_from(decoder).map_err(|e| CoreError::Export(e.to_string()))?;
    let dpi = width_px.max(1) as f32 * 25.4 / CHART_WIDTH_MM;
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
    Ok(())
}

fn format_amount(v: f64) -> String {
    if v.fract().abs() < 1e-9 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
