// ═══════════════════════════════════════════════════════════════════
// Dashboard Tests — session, refresh, filters, rendering, bookmarks,
// reports and persistence through the public facade
// ═══════════════════════════════════════════════════════════════════

mod common;

use bi_dashboard_core::errors::CoreError;
use bi_dashboard_core::models::chart::{ChartKind, ChartVisibility};
use bi_dashboard_core::models::filter::FilterState;
use bi_dashboard_core::models::report::{Frequency, ReportFormat};
use bi_dashboard_core::models::settings::{DashboardVariant, Settings};
use bi_dashboard_core::models::state::ClientState;
use bi_dashboard_core::render::scene::Point;
use bi_dashboard_core::render::treemap::TreemapClick;
use bi_dashboard_core::Dashboard;

use common::{tiny_png, FakeRasterizer, MockApi, TOKEN};

fn dashboard_with(api: MockApi) -> Dashboard {
    Dashboard::new(Box::new(api), ClientState::default()).with_rasterizer(Box::new(FakeRasterizer))
}

async fn logged_in(api: MockApi) -> Dashboard {
    let mut d = dashboard_with(api);
    d.login("ada", "secret").await.unwrap();
    d
}

async fn loaded() -> Dashboard {
    let mut d = logged_in(MockApi::new()).await;
    d.refresh_data().await.unwrap();
    d
}

// ── Session ─────────────────────────────────────────────────────────

mod session {
    use super::*;

    #[tokio::test]
    async fn login_stores_token_and_identity() {
        let mut d = dashboard_with(MockApi::new());
        assert!(!d.is_logged_in());
        assert!(d.identity().is_anonymous());

        let identity = d.login("ada", "secret").await.unwrap();
        assert_eq!(identity.name, "Ada");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
        assert!(d.is_logged_in());
        assert!(d.has_unsaved_changes());
        assert_eq!(d.client_state().session_token.as_deref(), Some(TOKEN));
    }

    #[tokio::test]
    async fn bad_password_keeps_logged_out() {
        let mut d = dashboard_with(MockApi::new());
        let err = d.login("ada", "wrong").await.unwrap_err();
        assert!(matches!(err, CoreError::Api { status: 401, .. }));
        assert!(!d.is_logged_in());
    }

    #[tokio::test]
    async fn empty_username_is_rejected_locally() {
        let mut d = dashboard_with(MockApi::new());
        assert!(matches!(d.login("  ", "secret").await, Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn oauth_login() {
        let mut d = dashboard_with(MockApi::new());
        assert!(d.login_with_oauth("expired").await.is_err());
        let identity = d.login_with_oauth("google-credential").await.unwrap();
        assert_eq!(identity.name, "Ada");
    }

    #[tokio::test]
    async fn logout_forgets_token() {
        let mut d = logged_in(MockApi::new()).await;
        d.logout();
        assert!(!d.is_logged_in());
        assert!(d.identity().is_anonymous());
    }

    #[tokio::test]
    async fn data_calls_need_a_session() {
        let mut d = dashboard_with(MockApi::new());
        assert!(matches!(d.refresh_data().await, Err(CoreError::Unauthenticated(_))));
        assert!(matches!(d.load_catalog().await, Err(CoreError::Unauthenticated(_))));
        assert!(matches!(
            d.schedule_report(Frequency::Daily, "08:00", ReportFormat::Pdf, "ops@example.com").await,
            Err(CoreError::Unauthenticated(_))
        ));
    }
}

// ── Data & filters ──────────────────────────────────────────────────

mod data {
    use super::*;

    #[tokio::test]
    async fn refresh_ingests_and_sends_token() {
        let api = MockApi::new();
        let calls = api.calls();
        let mut d = logged_in(api).await;

        let report = d.refresh_data().await.unwrap();
        assert_eq!(report.accepted, 3);
        assert_eq!(report.rejected, 0);
        assert_eq!(d.records().len(), 3);
        assert_eq!(d.records()[2].date_key(), "2024-01-01");
        assert_eq!(calls.lock().unwrap().tokens, vec![TOKEN.to_string()]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_records() {
        let api = MockApi::new();
        let mut d = logged_in(api).await;
        d.refresh_data().await.unwrap();
        let before = d.record_snapshot();

        let mut failing = logged_in(MockApi::failing_records()).await;
        failing.ingest_raw(common::sample_raw());
        assert!(matches!(failing.refresh_data().await, Err(CoreError::Network(_))));
        assert_eq!(failing.records().len(), 3);
        assert_eq!(&*before, failing.records());
    }

    #[tokio::test]
    async fn catalog_loads_both_selectors() {
        let mut d = logged_in(MockApi::new()).await;
        d.load_catalog().await.unwrap();
        assert_eq!(d.products().len(), 2);
        assert_eq!(d.products()[1].product_id, "2");
        assert_eq!(d.stores()[0].store_id, "7");
    }

    #[tokio::test]
    async fn selection_is_checked_against_catalog() {
        let mut d = logged_in(MockApi::new()).await;
        // Nothing loaded yet: nothing to check against.
        assert!(d.check_filter(&FilterState::new("Z", "Q")).is_ok());

        d.load_catalog().await.unwrap();
        assert!(d.check_filter(&FilterState::all()).is_ok());
        assert!(d.check_filter(&FilterState::new("B", "X")).is_ok());
        assert!(matches!(
            d.check_filter(&FilterState::new("Z", "")),
            Err(CoreError::ValidationError(ref m)) if m.contains("'Z'")
        ));
        assert!(matches!(
            d.check_filter(&FilterState::new("", "Nowhere")),
            Err(CoreError::ValidationError(ref m)) if m.contains("Nowhere")
        ));
    }

    #[tokio::test]
    async fn filters_narrow_the_view() {
        let mut d = loaded().await;
        d.set_product_filter(" A ");
        assert_eq!(d.filter(), &FilterState::new("A", ""));
        assert_eq!(d.totals().revenue, 125.0);

        d.set_store_filter("Y");
        assert_eq!(d.filtered_records().len(), 1);

        d.clear_filters();
        assert_eq!(d.totals().revenue, 175.0);
    }

    #[tokio::test]
    async fn snapshot_outlives_refresh() {
        let mut d = loaded().await;
        let snapshot = d.record_snapshot();
        d.ingest_raw(Vec::new());
        assert!(d.records().is_empty());
        assert_eq!(snapshot.len(), 3);
    }
}

// ── Rendering ───────────────────────────────────────────────────────

mod rendering {
    use super::*;

    #[tokio::test]
    async fn renders_visible_charts_once() {
        let mut d = loaded().await;
        let first = d.render_charts().unwrap();
        assert_eq!(first, ChartKind::ALL.to_vec());
        assert!(d.render_charts().unwrap().is_empty());

        d.set_product_filter("A");
        let after_filter = d.render_charts().unwrap();
        assert!(after_filter.contains(&ChartKind::Bar));
    }

    #[tokio::test]
    async fn hidden_charts_are_skipped() {
        let mut d = loaded().await;
        d.set_chart_visible(ChartKind::Bubble, false);
        let drawn = d.render_charts().unwrap();
        assert!(!drawn.contains(&ChartKind::Bubble));
        assert!(d.svg(ChartKind::Bubble).is_none());
        assert!(d.svg(ChartKind::Bar).unwrap().contains("Revenue by Product"));
    }

    #[tokio::test]
    async fn settings_change_redraws_at_new_size() {
        let mut d = loaded().await;
        d.render_charts().unwrap();
        let settings = Settings {
            chart_width: 320.0,
            chart_height: 240.0,
            ..Settings::default()
        };
        d.update_settings(settings).unwrap();
        assert_eq!(d.render_charts().unwrap().len(), 7);
        assert_eq!(d.surface(ChartKind::Pie).unwrap().width(), 320.0);
    }

    #[tokio::test]
    async fn invalid_settings_are_refused() {
        let mut d = dashboard_with(MockApi::new());
        let settings = Settings {
            refresh_interval_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(d.update_settings(settings), Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn empty_view_renders_placeholders() {
        let mut d = loaded().await;
        d.set_product_filter("does-not-exist");
        d.render_charts().unwrap();
        for kind in ChartKind::ALL {
            assert!(d.svg(kind).unwrap().contains("No data available"), "{kind}");
        }
    }

    #[tokio::test]
    async fn treemap_drill_redraws_only_treemap() {
        let mut d = loaded().await;
        d.render_charts().unwrap();

        d.treemap_drill_down("Drinks").unwrap();
        assert_eq!(d.treemap_view().breadcrumb(), "All › Drinks");
        assert_eq!(d.render_charts().unwrap(), vec![ChartKind::Treemap]);

        assert!(d.treemap_drill_up());
        assert!(d.treemap_view().is_at_root());
        assert!(matches!(d.treemap_drill_down("Nope"), Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn treemap_click_navigates() {
        let mut d = loaded().await;
        d.render_charts().unwrap();
        let svg = d.svg(ChartKind::Treemap).unwrap();
        assert!(svg.contains("Drinks"));

        // The first cell starts just inside the top-left of the plot area.
        assert_eq!(d.treemap_click(Point::new(6.0, 28.0)), TreemapClick::DrilledDown("Drinks".into()));
        d.render_charts().unwrap();
        assert_eq!(d.treemap_click(Point::new(1.0, 1.0)), TreemapClick::DrilledUp);
    }
}

// ── Exports & reports ───────────────────────────────────────────────

mod exports {
    use super::*;

    #[tokio::test]
    async fn every_format_produces_bytes() {
        let mut d = loaded().await;
        assert!(d.export(ReportFormat::Xlsx).unwrap().starts_with(b"PK"));
        assert!(d.export(ReportFormat::Pdf).unwrap().starts_with(b"%PDF"));
        assert_eq!(d.export(ReportFormat::Png).unwrap(), tiny_png());
        let csv = String::from_utf8(d.export(ReportFormat::Csv).unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[tokio::test]
    async fn png_of_hidden_chart_is_an_error() {
        let mut d = loaded().await;
        d.set_chart_visible(ChartKind::Line, false);
        assert!(matches!(d.export_png(ChartKind::Line), Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn png_with_nothing_visible_is_an_error() {
        let mut d = loaded().await;
        let mut none = ChartVisibility::all_visible();
        for kind in ChartKind::ALL {
            none.set(kind, false);
        }
        d.set_visibility(none);
        assert!(matches!(d.export(ReportFormat::Png), Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn email_attaches_each_format() {
        let api = MockApi::new();
        let calls = api.calls();
        let mut d = logged_in(api).await;
        d.refresh_data().await.unwrap();

        d.email_report("ops@example.com", "Weekly numbers", &[ReportFormat::Pdf, ReportFormat::Csv])
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        let email = &calls.emails[0];
        assert_eq!(email.message, "Weekly numbers");
        let names: Vec<&str> = email.attachments.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["dashboard-report.pdf", "dashboard-report.csv"]);
        assert!(calls.tokens.iter().all(|t| t == TOKEN));
    }

    #[tokio::test]
    async fn email_without_formats_is_refused() {
        let mut d = loaded().await;
        assert!(matches!(
            d.email_report("ops@example.com", "", &[]).await,
            Err(CoreError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn schedule_is_sent() {
        let api = MockApi::new();
        let calls = api.calls();
        let mut d = logged_in(api).await;
        d.schedule_report(Frequency::Monthly, "07:30", ReportFormat::Xlsx, "ops@example.com")
            .await
            .unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls.schedules.len(), 1);
        assert_eq!(calls.schedules[0].frequency, Frequency::Monthly);
    }
}

// ── Bookmarks ───────────────────────────────────────────────────────

mod bookmarks {
    use super::*;

    #[tokio::test]
    async fn bookmark_restores_filter_and_visibility() {
        let mut d = loaded().await;
        d.set_product_filter("A");
        d.set_chart_visible(ChartKind::Histogram, false);
        d.save_bookmark("drinks").unwrap();

        d.clear_filters();
        d.set_visibility(ChartVisibility::all_visible());
        d.apply_bookmark("drinks").unwrap();

        assert_eq!(d.filter().product, "A");
        assert!(!d.visibility().is_visible(ChartKind::Histogram));
        assert_eq!(d.totals().revenue, 125.0);
    }

    #[tokio::test]
    async fn bookmarks_are_scoped_per_variant() {
        let mut d = dashboard_with(MockApi::new());
        d.save_bookmark("sales view").unwrap();

        let settings = Settings {
            variant: DashboardVariant::ProductPerformance,
            ..Settings::default()
        };
        d.update_settings(settings).unwrap();
        assert!(d.bookmarks().is_empty());
        assert!(matches!(d.apply_bookmark("sales view"), Err(CoreError::BookmarkNotFound(_))));
    }

    #[tokio::test]
    async fn rename_update_delete() {
        let mut d = dashboard_with(MockApi::new());
        let id = d.save_bookmark("one").unwrap();
        d.rename_bookmark("one", "two").unwrap();
        assert_eq!(d.bookmarks()[0].id, id);

        d.set_store_filter("Y");
        d.update_bookmark("two").unwrap();
        assert_eq!(d.bookmarks()[0].store, "Y");

        d.delete_bookmark("two").unwrap();
        assert!(d.bookmarks().is_empty());
        assert!(matches!(d.delete_bookmark("two"), Err(CoreError::BookmarkNotFound(_))));
    }
}

// ── Persistence ─────────────────────────────────────────────────────

mod persistence {
    use super::*;

    #[tokio::test]
    async fn state_round_trips_through_bytes() {
        let mut d = logged_in(MockApi::new()).await;
        d.save_bookmark("kept").unwrap();
        let bytes = d.save_to_bytes("hunter2").unwrap();
        assert!(!d.has_unsaved_changes());

        let restored = Dashboard::load_from_bytes(Box::new(MockApi::new()), &bytes, "hunter2").unwrap();
        assert!(restored.is_logged_in());
        assert_eq!(restored.bookmarks()[0].name, "kept");
        assert!(!restored.has_unsaved_changes());

        let err = Dashboard::load_from_bytes(Box::new(MockApi::new()), &bytes, "wrong").unwrap_err();
        assert!(matches!(err, CoreError::Decryption));
    }

    #[tokio::test]
    async fn state_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.bids");

        let mut d = logged_in(MockApi::new()).await;
        d.save_to_file(&path, "pw").unwrap();
        let restored = Dashboard::load_from_file(Box::new(MockApi::new()), &path, "pw").unwrap();
        assert_eq!(restored.identity().name, "Ada");
    }
}
