// ═══════════════════════════════════════════════════════════════════
// Export Tests — CSV, XLSX, PDF and PNG artifacts
// ═══════════════════════════════════════════════════════════════════

mod common;

use bi_dashboard_core::errors::CoreError;
use bi_dashboard_core::models::chart::{ChartDatum, ChartKind, SeriesDatum};
use bi_dashboard_core::models::record::TransactionRecord;
use bi_dashboard_core::render::raster::{Rasterizer, ResvgRasterizer};
use bi_dashboard_core::render::scene::Surface;
use bi_dashboard_core::render::{render_chart, RenderOptions};
use bi_dashboard_core::services::export_service::{ChartSnapshot, ExportService, RECORD_COLUMNS};

use common::{refs, sample_records, tiny_png, FailingRasterizer, FakeRasterizer};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn snapshots() -> Vec<ChartSnapshot> {
    let datum = ChartDatum::Series(SeriesDatum::new(vec!["A".into(), "B".into()], vec![125.0, 50.0]));
    [ChartKind::Bar, ChartKind::Pie]
        .into_iter()
        .map(|kind| {
            let mut surface = Surface::new(320.0, 200.0);
            render_chart(&mut surface, kind, &datum, RenderOptions::default()).unwrap();
            ChartSnapshot::from_surface(kind, &surface)
        })
        .collect()
}

// ── CSV ─────────────────────────────────────────────────────────────

mod csv {
    use super::*;

    #[test]
    fn header_and_one_row_per_record() {
        let records = sample_records();
        let csv = ExportService::new().to_csv(&refs(&records));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], RECORD_COLUMNS.join(","));
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "2024-01-01,A,Drinks,X,,4,100,30");
    }

    #[test]
    fn special_characters_are_quoted() {
        let records = vec![TransactionRecord::new("2024-01-01", "Fish, Chips", "The \"Pier\"", 9.5)];
        let csv = ExportService::new().to_csv(&refs(&records));
        assert!(csv.contains("\"Fish, Chips\""));
        assert!(csv.contains("\"The \"\"Pier\"\"\""));
    }

    #[test]
    fn fractional_amounts_keep_their_decimals() {
        let records = vec![TransactionRecord::new("2024-01-01", "Tea", "North", 12.5)];
        let csv = ExportService::new().to_csv(&refs(&records));
        let row: Vec<&str> = csv.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(row[6], "12.5");
    }

    #[test]
    fn empty_view_is_header_only() {
        let csv = ExportService::new().to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }
}

// ── XLSX ────────────────────────────────────────────────────────────

mod xlsx {
    use super::*;

    #[test]
    fn workbook_is_a_zip() {
        let records = sample_records();
        let bytes = ExportService::new()
            .to_xlsx(&refs(&records), &snapshots(), &FakeRasterizer)
            .unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn failing_chart_does_not_abort() {
        let records = sample_records();
        let bytes = ExportService::new()
            .to_xlsx(&refs(&records), &snapshots(), &FailingRasterizer)
            .unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}

// ── PDF ─────────────────────────────────────────────────────────────

mod pdf {
    use super::*;

    #[test]
    fn document_has_pdf_header() {
        let records = sample_records();
        let bytes = ExportService::new()
            .to_pdf("BI Dashboard Report", &refs(&records), &snapshots(), &FakeRasterizer)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn failing_chart_does_not_abort() {
        let records = sample_records();
        let bytes = ExportService::new()
            .to_pdf("Report", &refs(&records), &snapshots(), &FailingRasterizer)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_tables_paginate() {
        let records: Vec<TransactionRecord> = (0..200)
            .map(|i| TransactionRecord::new("2024-01-01", format!("P{i}"), "S", f64::from(i)))
            .collect();
        let short = ExportService::new()
            .to_pdf("Report", &refs(&records[..5]), &[], &FakeRasterizer)
            .unwrap();
        let long = ExportService::new()
            .to_pdf("Report", &refs(&records), &[], &FakeRasterizer)
            .unwrap();
        assert!(long.len() > short.len());
    }
}

// ── PNG ─────────────────────────────────────────────────────────────

mod png {
    use super::*;

    #[test]
    fn png_comes_from_rasterizer() {
        let charts = snapshots();
        let bytes = ExportService::new().to_png(&charts[0], &FakeRasterizer).unwrap();
        assert_eq!(bytes, tiny_png());
    }

    #[test]
    fn png_failure_names_the_chart() {
        let charts = snapshots();
        let err = ExportService::new().to_png(&charts[1], &FailingRasterizer).unwrap_err();
        assert!(matches!(err, CoreError::Rasterization { ref chart, .. } if chart == "pie"));
    }

    #[test]
    fn rasterize_all_keeps_going_after_failure() {
        let charts = snapshots();
        let out = ExportService::new().rasterize_all(&charts, &FailingRasterizer);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.error_placeholder().is_some()));
        assert!(out[0].error_placeholder().unwrap().starts_with("Chart error:"));
    }

    #[test]
    fn resvg_produces_png() {
        let charts = snapshots();
        let bytes = ResvgRasterizer::new()
            .rasterize(&charts[0].svg, charts[0].width, charts[0].height)
            .unwrap();
        assert_eq!(bytes[..8], PNG_SIGNATURE);
    }

    #[test]
    fn resvg_loads_fonts_on_first_use() {
        let rasterizer = ResvgRasterizer::new();
        let shared = rasterizer.clone();
        assert!(format!("{rasterizer:?}").contains("font_faces: None"));

        let charts = snapshots();
        rasterizer.rasterize(&charts[0].svg, charts[0].width, charts[0].height).unwrap();
        assert!(format!("{shared:?}").contains("font_faces: Some("));
    }

    #[test]
    fn resvg_rejects_garbage() {
        let err = ResvgRasterizer::new().rasterize("not svg", 10, 10).unwrap_err();
        assert!(matches!(err, CoreError::Rasterization { .. }));
    }
}
