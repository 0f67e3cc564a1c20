// ═══════════════════════════════════════════════════════════════════
// Model Tests — records & ingestion, filters, charts, bookmarks,
// settings, session identity, report requests, client state
// ═══════════════════════════════════════════════════════════════════

mod common;

use serde_json::json;

use bi_dashboard_core::errors::CoreError;
use bi_dashboard_core::models::bookmark::Bookmark;
use bi_dashboard_core::models::catalog::{ProductOption, StoreOption};
use bi_dashboard_core::models::chart::{ChartDatum, ChartKind, ChartVisibility, HierarchyNode, SeriesDatum};
use bi_dashboard_core::models::filter::FilterState;
use bi_dashboard_core::models::record::{ingest, RawRecord, RejectReason, TransactionRecord};
use bi_dashboard_core::models::report::{
    validate_recipient, Attachment, Frequency, ReportFormat, ScheduleReport,
};
use bi_dashboard_core::models::session::SessionIdentity;
use bi_dashboard_core::models::settings::{DashboardVariant, Settings, MAX_HISTOGRAM_BINS};
use bi_dashboard_core::models::state::ClientState;

fn raw(value: serde_json::Value) -> RawRecord {
    serde_json::from_value(value).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// TransactionRecord & ingestion
// ═══════════════════════════════════════════════════════════════════

mod record {
    use super::*;

    #[test]
    fn builder_sets_metrics() {
        let r = TransactionRecord::new("2024-01-01", "A", "X", 10.0)
            .with_category("Drinks")
            .with_customer("Cy")
            .with_units(3.0)
            .with_profit(-2.5);
        assert_eq!(r.category, "Drinks");
        assert_eq!(r.customer_name, "Cy");
        assert_eq!(r.units_sold, 3.0);
        assert_eq!(r.profit, -2.5);
    }

    #[test]
    fn date_key_normalizes_timestamps() {
        let plain = TransactionRecord::new("2024-03-01", "A", "X", 1.0);
        let rfc = TransactionRecord::new("2024-03-01T10:00:00Z", "A", "X", 1.0);
        let spaced = TransactionRecord::new("2024-03-01 23:59:59", "A", "X", 1.0);
        assert_eq!(plain.date_key(), "2024-03-01");
        assert_eq!(rfc.date_key(), "2024-03-01");
        assert_eq!(spaced.date_key(), "2024-03-01");
    }

    #[test]
    fn date_key_keeps_unparseable_strings() {
        let r = TransactionRecord::new("Q1 2024", "A", "X", 1.0);
        assert_eq!(r.date_key(), "Q1 2024");
    }

    #[test]
    fn raw_record_accepts_numeric_strings() {
        let rec = raw(json!({
            "date": "2024-01-01", "product_name": "A", "store_name": "X",
            "units_sold": "3", "revenue": " 12.50 ", "profit": 1
        }))
        .into_record()
        .unwrap();
        assert_eq!(rec.revenue, 12.5);
        assert_eq!(rec.units_sold, 3.0);
    }

    #[test]
    fn product_id_is_used_when_name_is_missing() {
        let rec = raw(json!({
            "date": "2024-01-01", "product_id": 42, "store_name": "X",
            "units_sold": 1, "revenue": 1, "profit": 0
        }))
        .into_record()
        .unwrap();
        assert_eq!(rec.product, "42");
    }

    #[test]
    fn malformed_metric_rejects_the_record() {
        let err = raw(json!({
            "date": "2024-01-01", "product_name": "A",
            "units_sold": 1, "revenue": "n/a", "profit": 0
        }))
        .into_record()
        .unwrap_err();
        assert_eq!(err, RejectReason::MalformedMetric("revenue"));
    }

    #[test]
    fn null_metric_is_not_coerced_to_zero() {
        let err = raw(json!({
            "date": "2024-01-01", "product_name": "A",
            "units_sold": null, "revenue": 5, "profit": 0
        }))
        .into_record()
        .unwrap_err();
        assert_eq!(err, RejectReason::MalformedMetric("units_sold"));
    }

    #[test]
    fn missing_keys_reject() {
        let no_product = raw(json!({ "date": "2024-01-01", "units_sold": 1, "revenue": 1, "profit": 1 }));
        assert_eq!(no_product.into_record().unwrap_err(), RejectReason::MissingProduct);

        let no_date = raw(json!({ "product_name": "A", "units_sold": 1, "revenue": 1, "profit": 1 }));
        assert_eq!(no_date.into_record().unwrap_err(), RejectReason::MissingDate);
    }

    #[test]
    fn ingest_counts_and_keeps_order() {
        let mut batch = common::sample_raw();
        batch.insert(1, raw(json!({ "date": "2024-01-01", "product_name": "Z", "revenue": "oops" })));
        let (records, report) = ingest(batch);
        assert_eq!(report.accepted, 3);
        assert_eq!(report.rejected, 1);
        let products: Vec<&str> = records.iter().map(|r| r.product.as_str()).collect();
        assert_eq!(products, ["A", "B", "A"]);
    }

    #[test]
    fn reject_reason_display() {
        assert_eq!(RejectReason::MalformedMetric("profit").to_string(), "malformed profit");
        assert_eq!(RejectReason::MissingDate.to_string(), "missing date");
    }
}

// ═══════════════════════════════════════════════════════════════════
// FilterState
// ═══════════════════════════════════════════════════════════════════

mod filter {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let records = common::sample_records();
        assert!(FilterState::all().is_unfiltered());
        assert_eq!(FilterState::all().apply(&records).len(), 3);
    }

    #[test]
    fn product_filter() {
        let records = common::sample_records();
        let view = FilterState::new("A", "").apply(&records);
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|r| r.product == "A"));
    }

    #[test]
    fn product_and_store_filter() {
        let records = common::sample_records();
        let view = FilterState::new("A", "Y").apply(&records);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].revenue, 25.0);
    }

    #[test]
    fn unknown_value_yields_empty_view() {
        let records = common::sample_records();
        assert!(FilterState::new("", "Nowhere").apply(&records).is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Charts
// ═══════════════════════════════════════════════════════════════════

mod chart {
    use super::*;

    #[test]
    fn chart_kind_round_trips_through_strings() {
        for kind in ChartKind::ALL {
            assert_eq!(kind.to_string().parse::<ChartKind>().unwrap(), kind);
        }
        assert_eq!("TreeMap".parse::<ChartKind>().unwrap(), ChartKind::Treemap);
        assert!("radar".parse::<ChartKind>().is_err());
    }

    #[test]
    fn every_kind_has_a_title() {
        for kind in ChartKind::ALL {
            assert!(!kind.title().is_empty());
        }
    }

    #[test]
    fn series_helpers() {
        let s = SeriesDatum::new(vec!["A".into(), "B".into()], vec![125.0, 50.0]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.total(), 175.0);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![("A", 125.0), ("B", 50.0)]);
        assert!(SeriesDatum::default().is_empty());
    }

    #[test]
    fn hierarchy_weights_and_lookup() {
        let tree = HierarchyNode::branch(
            "All",
            vec![
                HierarchyNode::branch("Drinks", vec![HierarchyNode::leaf("A", 125.0)]),
                HierarchyNode::branch(
                    "Snacks",
                    vec![HierarchyNode::leaf("B", 50.0), HierarchyNode::leaf("C", 5.0)],
                ),
            ],
        );
        assert_eq!(tree.weight(), 180.0);
        let snacks = tree.child("Snacks").unwrap();
        assert_eq!(snacks.weight(), 55.0);
        assert_eq!(snacks.child("C").and_then(|c| c.value), Some(5.0));
        assert!(tree.child("Bakery").is_none());
    }

    #[test]
    fn datum_emptiness() {
        assert!(ChartDatum::Series(SeriesDatum::default()).is_empty());
        assert!(ChartDatum::Distribution(vec![]).is_empty());
        assert!(ChartDatum::Hierarchy(HierarchyNode::branch("All", vec![])).is_empty());
        assert!(ChartDatum::Rollups(vec![]).is_empty());
        assert!(!ChartDatum::Distribution(vec![1.0]).is_empty());
    }

    #[test]
    fn visibility_defaults_to_all_visible() {
        let mut v = ChartVisibility::default();
        assert_eq!(v.visible().len(), 7);
        v.set(ChartKind::Pie, false);
        assert!(!v.is_visible(ChartKind::Pie));
        assert_eq!(v.visible().len(), 6);
        assert_eq!(v.visible()[0], ChartKind::Bar);
    }

    #[test]
    fn missing_visibility_entries_count_as_visible() {
        let v = ChartVisibility(Default::default());
        assert!(v.is_visible(ChartKind::Bubble));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Bookmarks & catalog
// ═══════════════════════════════════════════════════════════════════

mod bookmark {
    use super::*;

    #[test]
    fn bookmark_captures_selection() {
        let mut charts = ChartVisibility::all_visible();
        charts.set(ChartKind::Histogram, false);
        let b = Bookmark::new("Q1", &FilterState::new("A", "X"), &charts);
        assert_eq!(b.filter(), FilterState::new("A", "X"));
        assert!(!b.charts.is_visible(ChartKind::Histogram));
    }

    #[test]
    fn bookmark_serde_roundtrip() {
        let b = Bookmark::new("Q1", &FilterState::new("A", ""), &ChartVisibility::all_visible());
        let json = serde_json::to_string(&b).unwrap();
        let back: Bookmark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn catalog_ids_accept_numbers_and_strings() {
        let products: Vec<ProductOption> = serde_json::from_value(json!([
            { "product_id": 1, "product_name": "Coffee" },
            { "product_id": "P-2", "product_name": "Tea" }
        ]))
        .unwrap();
        assert_eq!(products[0].product_id, "1");
        assert_eq!(products[1].product_id, "P-2");
        assert_eq!(products[0].filter_value(), "Coffee");

        let stores: Vec<StoreOption> =
            serde_json::from_value(json!([{ "store_id": 3, "store_name": "North" }])).unwrap();
        assert_eq!(stores[0].store_id, "3");
        assert_eq!(stores[0].filter_value(), "North");
    }

    #[test]
    fn product_filter_value_matches_ingested_product() {
        // Rows that carry both fields are keyed by name, id-only rows by id.
        let products: Vec<ProductOption> = serde_json::from_value(json!([
            { "product_id": 7, "product_name": "Mocha" },
            { "product_id": 8 }
        ]))
        .unwrap();
        let raw: Vec<RawRecord> = serde_json::from_value(json!([
            { "date": "2024-01-01", "product_id": 7, "product_name": "Mocha", "store_name": "X",
              "units_sold": 1, "revenue": 5, "profit": 1 },
            { "date": "2024-01-01", "product_id": 8, "store_name": "X",
              "units_sold": 1, "revenue": 5, "profit": 1 }
        ]))
        .unwrap();
        let records: Vec<TransactionRecord> = raw.into_iter().map(|r| r.into_record().unwrap()).collect();
        for (option, record) in products.iter().zip(&records) {
            let filter = FilterState::new(option.filter_value(), "");
            assert!(filter.matches(record), "{} should select {}", option.filter_value(), record.product);
        }
    }

    #[test]
    fn catalog_rejects_object_ids() {
        let parsed: Result<Vec<StoreOption>, _> =
            serde_json::from_value(json!([{ "store_id": { "x": 1 }, "store_name": "N" }]));
        assert!(parsed.is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.refresh_interval_secs, 60);
        assert_eq!(s.histogram_bins, 12);
        assert_eq!(s.variant, DashboardVariant::Sales);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn environment_overlay() {
        let s = Settings::from_lookup(lookup(&[
            ("BI_DASHBOARD_API_URL", "http://localhost:5000/"),
            ("BI_DASHBOARD_VARIANT", "pp"),
            ("BI_DASHBOARD_REFRESH_SECS", "15"),
            ("BI_DASHBOARD_HISTOGRAM_BINS", "20"),
        ]))
        .unwrap();
        assert_eq!(s.api_base_url, "http://localhost:5000");
        assert_eq!(s.variant, DashboardVariant::ProductPerformance);
        assert_eq!(s.refresh_interval_secs, 15);
        assert_eq!(s.histogram_bins, 20);
    }

    #[test]
    fn unparseable_environment_is_an_error() {
        let err = Settings::from_lookup(lookup(&[("BI_DASHBOARD_REFRESH_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn out_of_range_bins_fail_validation() {
        let s = Settings {
            histogram_bins: MAX_HISTOGRAM_BINS + 1,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn tiny_chart_size_fails_validation() {
        let s = Settings {
            chart_width: 20.0,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn variant_namespaces_differ() {
        assert_eq!(DashboardVariant::Sales.bookmark_namespace(), "bi_dashboard_bookmarks");
        assert_eq!(
            DashboardVariant::ProductPerformance.bookmark_namespace(),
            "pp_dashboard_bookmarks"
        );
        assert!("warehouse".parse::<DashboardVariant>().is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Session identity
// ═══════════════════════════════════════════════════════════════════

mod session {
    use super::*;

    #[test]
    fn decodes_jwt_payload() {
        let id = SessionIdentity::decode(common::TOKEN);
        assert_eq!(id.name, "Ada");
        assert_eq!(id.email.as_deref(), Some("ada@example.com"));
        assert_eq!(id.expires_at, Some(4_102_444_800));
        assert!(!id.is_expired_at(1_700_000_000));
        assert!(id.is_expired_at(4_102_444_800));
    }

    #[test]
    fn malformed_token_is_anonymous() {
        for token in ["", "not-a-jwt", "a.b.c", "a.%%%.c"] {
            let id = SessionIdentity::decode(token);
            assert!(id.is_anonymous(), "token {token:?}");
        }
    }

    #[test]
    fn name_falls_back_to_email() {
        // {"email":"ops@example.com"}
        let id = SessionIdentity::decode("h.eyJlbWFpbCI6Im9wc0BleGFtcGxlLmNvbSJ9.s");
        assert_eq!(id.name, "ops@example.com");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Report requests
// ═══════════════════════════════════════════════════════════════════

mod report {
    use super::*;

    #[test]
    fn format_metadata() {
        assert_eq!(ReportFormat::Pdf.mime_type(), "application/pdf");
        assert_eq!(ReportFormat::Png.extension(), "png");
        assert_eq!("Excel".parse::<ReportFormat>().unwrap(), ReportFormat::Xlsx);
        assert!("docx".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn attachment_is_base64() {
        let a = Attachment::from_bytes("r.csv", ReportFormat::Csv, b"a,b\n1,2\n");
        assert_eq!(a.content, "YSxiCjEsMgo=");
        assert_eq!(a.decoded_len(), 8);
        assert_eq!(a.mime_type, "text/csv");
    }

    #[test]
    fn schedule_normalizes_time() {
        let s = ScheduleReport::new(Frequency::Weekly, "9:05", ReportFormat::Pdf, " ops@example.com ").unwrap();
        assert_eq!(s.time, "09:05");
        assert_eq!(s.recipient, "ops@example.com");
    }

    #[test]
    fn schedule_rejects_bad_time() {
        assert!(ScheduleReport::new(Frequency::Daily, "25:00", ReportFormat::Pdf, "a@b.io").is_err());
        assert!(ScheduleReport::new(Frequency::Daily, "noon", ReportFormat::Pdf, "a@b.io").is_err());
    }

    #[test]
    fn recipient_shape() {
        assert!(validate_recipient("a@b.io").is_ok());
        for bad in ["", "ab.io", "a@b", "@b.io", "a@.io", "a b@c.io", "a@b@c.io"] {
            assert!(validate_recipient(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn frequency_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Frequency::Monthly).unwrap(), "\"monthly\"");
        assert_eq!("DAILY".parse::<Frequency>().unwrap(), Frequency::Daily);
    }
}

// ═══════════════════════════════════════════════════════════════════
// ClientState
// ═══════════════════════════════════════════════════════════════════

mod client_state {
    use super::*;

    #[test]
    fn bookmark_namespaces_are_created_on_demand() {
        let mut state = ClientState::default();
        assert!(state.bookmarks_in("bi_dashboard_bookmarks").is_none());
        let b = Bookmark::new("Q1", &FilterState::all(), &ChartVisibility::all_visible());
        state.bookmarks_in_mut("bi_dashboard_bookmarks").insert(b.name.clone(), b);
        assert_eq!(state.bookmark_count(), 1);
        assert!(state.bookmarks_in("pp_dashboard_bookmarks").is_none());
    }

    #[test]
    fn bincode_roundtrip() {
        let mut state = ClientState {
            session_token: Some(common::TOKEN.into()),
            ..ClientState::default()
        };
        let b = Bookmark::new("Q1", &FilterState::new("A", "X"), &ChartVisibility::all_visible());
        state.bookmarks_in_mut("bi_dashboard_bookmarks").insert(b.name.clone(), b);
        let bytes = bincode::serialize(&state).unwrap();
        let back: ClientState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, state);
    }
}
