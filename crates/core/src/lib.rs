pub mod errors;
pub mod models;
pub mod providers;
pub mod render;
pub mod services;
pub mod storage;

use std::collections::BTreeMap;
use std::sync::Arc;

use models::{
    bookmark::Bookmark,
    catalog::{ProductOption, StoreOption},
    chart::{ChartDatum, ChartKind, ChartVisibility},
    filter::FilterState,
    record::{ingest, IngestReport, RawRecord, TransactionRecord},
    report::{Frequency, ReportFormat},
    session::SessionIdentity,
    settings::Settings,
    state::ClientState,
};
use providers::http::HttpDashboardApi;
use providers::traits::DashboardApi;
use render::raster::{Rasterizer, ResvgRasterizer};
use render::scene::{Point, Surface};
use render::treemap::{render_treemap, TreemapClick, TreemapLayout, TreemapView};
use render::{RenderOptions, RenderOutcome};
use services::{
    aggregation_service::MetricTotals,
    bookmark_service::BookmarkService,
    chart_service::{ChartService, RenderKey},
    export_service::{ChartSnapshot, ExportService},
    report_service::ReportService,
};
use storage::manager::StorageManager;

use errors::CoreError;

/// Title of exported documents.
const REPORT_TITLE: &str = "BI Dashboard Report";

/// File stem of emailed attachments.
const ATTACHMENT_STEM: &str = "dashboard-report";

/// Main entry point of the BI dashboard core.
///
/// Owns the fetched records, the filter and chart selection, one retained
/// surface per chart, the persisted client state, and the services that
/// operate on them. All mutation goes through `&mut self`.
#[must_use]
pub struct Dashboard {
    state: ClientState,
    api: Box<dyn DashboardApi>,
    rasterizer: Box<dyn Rasterizer>,
    records: Arc<[TransactionRecord]>,
    products: Vec<ProductOption>,
    stores: Vec<StoreOption>,
    filter: FilterState,
    visibility: ChartVisibility,
    surfaces: BTreeMap<ChartKind, Surface>,
    treemap: TreemapView,
    treemap_layout: TreemapLayout,
    last_ingest: IngestReport,
    chart_service: ChartService,
    bookmark_service: BookmarkService,
    export_service: ExportService,
    report_service: ReportService,
    /// Tracks whether the client state changed since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("api", &self.api.name())
            .field("records", &self.records.len())
            .field("filter", &self.filter)
            .field("logged_in", &self.is_logged_in())
            .field("bookmarks", &self.state.bookmark_count())
            .field("settings", &self.state.settings)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Dashboard {
    /// Dashboard over an arbitrary API implementation.
    pub fn new(api: Box<dyn DashboardApi>, state: ClientState) -> Self {
        Self {
            state,
            api,
            rasterizer: Box::new(ResvgRasterizer::new()),
            records: Arc::from(Vec::new()),
            products: Vec::new(),
            stores: Vec::new(),
            filter: FilterState::all(),
            visibility: ChartVisibility::all_visible(),
            surfaces: BTreeMap::new(),
            treemap: TreemapView::new(models::chart::HierarchyNode::branch("All", Vec::new())),
            treemap_layout: TreemapLayout::default(),
            last_ingest: IngestReport::default(),
            chart_service: ChartService::new(),
            bookmark_service: BookmarkService::new(),
            export_service: ExportService::new(),
            report_service: ReportService::new(),
            dirty: false,
        }
    }

    /// Dashboard talking HTTP to the API configured in `state.settings`.
    pub fn connect(state: ClientState) -> Self {
        let api = HttpDashboardApi::from_settings(&state.settings);
        Self::new(Box::new(api), state)
    }

    /// Replace the PNG rasterizer used by exports.
    pub fn with_rasterizer(mut self, rasterizer: Box<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Restore from encrypted client-state bytes.
    /// Use this for WASM / desktop shells where the host handles file I/O.
    pub fn load_from_bytes(
        api: Box<dyn DashboardApi>,
        encrypted: &[u8],
        password: &str,
    ) -> Result<Self, CoreError> {
        let state = StorageManager::load_from_bytes(encrypted, password)?;
        Ok(Self::new(api, state))
    }

    /// Encrypt the client state. Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self, password: &str) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.state, password)?;
        self.dirty = false;
        Ok(bytes)
    }

    /// Restore from an encrypted state file on disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(
        api: Box<dyn DashboardApi>,
        path: impl AsRef<std::path::Path>,
        password: &str,
    ) -> Result<Self, CoreError> {
        let state = StorageManager::load_from_file(path, password)?;
        Ok(Self::new(api, state))
    }

    /// Save to an encrypted state file on disk (native only).
    /// Clears the unsaved-changes flag on success.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(&mut self, path: impl AsRef<std::path::Path>, password: &str) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.state, path, password)?;
        self.dirty = false;
        Ok(())
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn client_state(&self) -> &ClientState {
        &self.state
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Replace the settings after validating them.
    ///
    /// Every chart redraws on the next render. The API client is not
    /// rebuilt; call [`Dashboard::connect`] again after changing the URL.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), CoreError> {
        settings.validate()?;
        self.state.settings = settings;
        self.chart_service.invalidate_all();
        self.dirty = true;
        Ok(())
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Password login. The bearer token is kept in the client state.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<SessionIdentity, CoreError> {
        if username.trim().is_empty() {
            return Err(CoreError::ValidationError("Username must not be empty".into()));
        }
        let token = self.api.login(username.trim(), password).await?;
        Ok(self.start_session(token))
    }

    /// Login with a credential from an external identity provider.
    pub async fn login_with_oauth(&mut self, credential: &str) -> Result<SessionIdentity, CoreError> {
        if credential.trim().is_empty() {
            return Err(CoreError::ValidationError("OAuth credential must not be empty".into()));
        }
        let token = self.api.login_with_oauth(credential.trim()).await?;
        Ok(self.start_session(token))
    }

    fn start_session(&mut self, token: String) -> SessionIdentity {
        let identity = SessionIdentity::decode(&token);
        self.state.session_token = Some(token);
        self.dirty = true;
        identity
    }

    /// Forget the token. Records and catalog stay until the next fetch.
    pub fn logout(&mut self) {
        if self.state.session_token.take().is_some() {
            self.dirty = true;
            tracing::info!("logged out");
        }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.state.session_token.is_some()
    }

    /// Display identity of the session; anonymous when logged out or the
    /// token payload is unreadable.
    #[must_use]
    pub fn identity(&self) -> SessionIdentity {
        self.state
            .session_token
            .as_deref()
            .map(SessionIdentity::decode)
            .unwrap_or_else(SessionIdentity::anonymous)
    }

    fn token(&self, operation: &str) -> Result<String, CoreError> {
        self.state
            .session_token
            .clone()
            .ok_or_else(|| CoreError::Unauthenticated(operation.to_string()))
    }

    // ── Data ────────────────────────────────────────────────────────

    /// Fetch the product and store selector entries.
    pub async fn load_catalog(&mut self) -> Result<(), CoreError> {
        let token = self.token("loading the catalog")?;
        let products = self.api.fetch_products(&token).await?;
        let stores = self.api.fetch_stores(&token).await?;
        tracing::info!(products = products.len(), stores = stores.len(), "catalog loaded");
        self.products = products;
        self.stores = stores;
        Ok(())
    }

    #[must_use]
    pub fn products(&self) -> &[ProductOption] {
        &self.products
    }

    #[must_use]
    pub fn stores(&self) -> &[StoreOption] {
        &self.stores
    }

    /// Check a selection against the loaded catalog. A dimension whose
    /// catalog was never loaded (or came back empty) is not checked.
    pub fn check_filter(&self, filter: &FilterState) -> Result<(), CoreError> {
        if filter.is_unfiltered() {
            return Ok(());
        }
        if !filter.product.is_empty()
            && !self.products.is_empty()
            && !self.products.iter().any(|p| p.filter_value() == filter.product)
        {
            return Err(CoreError::ValidationError(format!("Unknown product '{}'", filter.product)));
        }
        if !filter.store.is_empty()
            && !self.stores.is_empty()
            && !self.stores.iter().any(|s| s.filter_value() == filter.store)
        {
            return Err(CoreError::ValidationError(format!("Unknown store '{}'", filter.store)));
        }
        Ok(())
    }

    /// Re-fetch the records. On failure the previous record set is kept.
    pub async fn refresh_data(&mut self) -> Result<IngestReport, CoreError> {
        let token = self.token("fetching records")?;
        let raw = self.api.fetch_records(&token).await?;
        Ok(self.ingest_raw(raw))
    }

    /// Validate raw wire records and replace the record set with the
    /// accepted ones.
    pub fn ingest_raw(&mut self, raw: Vec<RawRecord>) -> IngestReport {
        let (records, report) = ingest(raw);
        self.records = Arc::from(records);
        self.last_ingest = report.clone();
        tracing::info!(accepted = report.accepted, rejected = report.rejected, "record set replaced");
        report
    }

    #[must_use]
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    /// Shared handle to the current record set; survives later refreshes.
    #[must_use]
    pub fn record_snapshot(&self) -> Arc<[TransactionRecord]> {
        Arc::clone(&self.records)
    }

    #[must_use]
    pub fn last_ingest(&self) -> &IngestReport {
        &self.last_ingest
    }

    // ── Filters & Visibility ────────────────────────────────────────

    #[must_use]
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
    }

    /// `""` selects all products.
    pub fn set_product_filter(&mut self, product: &str) {
        self.filter.product = product.trim().to_string();
    }

    /// `""` selects all stores.
    pub fn set_store_filter(&mut self, store: &str) {
        self.filter.store = store.trim().to_string();
    }

    pub fn clear_filters(&mut self) {
        self.filter = FilterState::all();
    }

    /// Records passing the current filter, in fetch order.
    #[must_use]
    pub fn filtered_records(&self) -> Vec<&TransactionRecord> {
        self.filter.apply(&self.records)
    }

    /// Summary totals of the filtered view.
    #[must_use]
    pub fn totals(&self) -> MetricTotals {
        self.chart_service.aggregation().totals(&self.filtered_records())
    }

    #[must_use]
    pub fn visibility(&self) -> &ChartVisibility {
        &self.visibility
    }

    pub fn set_visibility(&mut self, visibility: ChartVisibility) {
        self.visibility = visibility;
    }

    pub fn set_chart_visible(&mut self, kind: ChartKind, visible: bool) {
        self.visibility.set(kind, visible);
    }

    // ── Charts ──────────────────────────────────────────────────────

    /// Renderer-ready data of one chart for the filtered view.
    #[must_use]
    pub fn chart_datum(&self, kind: ChartKind) -> ChartDatum {
        self.chart_service.build_datum(kind, &self.filtered_records())
    }

    /// Redraw every visible chart whose data, size or (for the treemap) zoom
    /// path changed since its last render. Returns the kinds that were drawn.
    pub fn render_charts(&mut self) -> Result<Vec<ChartKind>, CoreError> {
        let (width, height) = (self.state.settings.chart_width, self.state.settings.chart_height);
        let options = RenderOptions {
            histogram_bins: self.state.settings.histogram_bins,
        };
        let filtered = self.filter.apply(&self.records);
        let mut redrawn = Vec::new();

        for kind in self.visibility.visible() {
            let datum = self.chart_service.build_datum(kind, &filtered);
            let surface = self
                .surfaces
                .entry(kind)
                .or_insert_with(|| Surface::new(width, height));
            if surface.width() != width || surface.height() != height {
                surface.resize(width, height);
            }

            let key = RenderKey::new(kind, width, height, &datum);
            let outcome = match datum {
                ChartDatum::Hierarchy(tree) => {
                    // The zoom path is part of what the treemap shows.
                    self.treemap.set_tree(tree);
                    let key = key.with_context(&self.treemap.breadcrumb());
                    if self.chart_service.needs_render(kind, key) {
                        surface.set_title(kind.title());
                        let (outcome, layout) = render_treemap(surface, &self.treemap);
                        self.treemap_layout = layout;
                        self.chart_service.mark_rendered(kind, key);
                        Some(outcome)
                    } else {
                        None
                    }
                }
                other => self.chart_service.render_if_changed(kind, surface, &other, options)?,
            };

            if let Some(outcome) = outcome {
                if let RenderOutcome::Drawn { marks } = outcome {
                    tracing::debug!(%kind, marks, "chart redrawn");
                }
                redrawn.push(kind);
            }
        }
        Ok(redrawn)
    }

    /// The retained surface of `kind`, once it has been rendered.
    #[must_use]
    pub fn surface(&self, kind: ChartKind) -> Option<&Surface> {
        self.surfaces.get(&kind)
    }

    #[must_use]
    pub fn svg(&self, kind: ChartKind) -> Option<String> {
        self.surface(kind).map(Surface::to_svg)
    }

    // ── Treemap Navigation ──────────────────────────────────────────

    #[must_use]
    pub fn treemap_view(&self) -> &TreemapView {
        &self.treemap
    }

    /// Sync the hierarchy with the filtered records before navigating.
    fn sync_treemap(&mut self) {
        if let ChartDatum::Hierarchy(tree) = self.chart_datum(ChartKind::Treemap) {
            self.treemap.set_tree(tree);
        }
    }

    pub fn treemap_drill_down(&mut self, name: &str) -> Result<(), CoreError> {
        self.sync_treemap();
        self.treemap.drill_down(name)
    }

    pub fn treemap_drill_up(&mut self) -> bool {
        self.treemap.drill_up()
    }

    pub fn treemap_reset(&mut self) {
        self.treemap.reset();
    }

    /// Forward a click at surface coordinates to the treemap, hit-testing
    /// against the last rendered layout.
    pub fn treemap_click(&mut self, point: Point) -> TreemapClick {
        self.treemap.click(point, &self.treemap_layout)
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Render (if needed) and snapshot every visible chart.
    pub fn chart_snapshots(&mut self) -> Result<Vec<ChartSnapshot>, CoreError> {
        self.render_charts()?;
        Ok(self
            .visibility
            .visible()
            .into_iter()
            .filter_map(|kind| {
                self.surfaces
                    .get(&kind)
                    .map(|surface| ChartSnapshot::from_surface(kind, surface))
            })
            .collect())
    }

    pub fn export_xlsx(&mut self) -> Result<Vec<u8>, CoreError> {
        let charts = self.chart_snapshots()?;
        let records = self.filtered_records();
        let bytes = self.export_service.to_xlsx(&records, &charts, self.rasterizer.as_ref())?;
        tracing::info!(rows = records.len(), charts = charts.len(), bytes = bytes.len(), "xlsx exported");
        Ok(bytes)
    }

    pub fn export_pdf(&mut self) -> Result<Vec<u8>, CoreError> {
        let charts = self.chart_snapshots()?;
        let records = self.filtered_records();
        let bytes = self
            .export_service
            .to_pdf(REPORT_TITLE, &records, &charts, self.rasterizer.as_ref())?;
        tracing::info!(rows = records.len(), charts = charts.len(), bytes = bytes.len(), "pdf exported");
        Ok(bytes)
    }

    #[must_use]
    pub fn export_csv(&self) -> String {
        self.export_service.to_csv(&self.filtered_records())
    }

    /// PNG of one chart. Unlike the document exports, a rasterization
    /// failure is returned to the caller.
    pub fn export_png(&mut self, kind: ChartKind) -> Result<Vec<u8>, CoreError> {
        self.render_charts()?;
        let surface = self.surfaces.get(&kind).ok_or_else(|| {
            CoreError::ValidationError(format!("The {kind} chart is hidden and has no image"))
        })?;
        let snapshot = ChartSnapshot::from_surface(kind, surface);
        self.export_service.to_png(&snapshot, self.rasterizer.as_ref())
    }

    /// Artifact bytes in `format`. PNG takes the first visible chart.
    pub fn export(&mut self, format: ReportFormat) -> Result<Vec<u8>, CoreError> {
        match format {
            ReportFormat::Xlsx => self.export_xlsx(),
            ReportFormat::Pdf => self.export_pdf(),
            ReportFormat::Csv => Ok(self.export_csv().into_bytes()),
            ReportFormat::Png => {
                let kind = self.visibility.visible().into_iter().next().ok_or_else(|| {
                    CoreError::ValidationError("No visible chart to export as an image".into())
                })?;
                self.export_png(kind)
            }
        }
    }

    // ── Reports ─────────────────────────────────────────────────────

    /// Export the current view in each of `formats` and email it.
    pub async fn email_report(
        &mut self,
        recipient: &str,
        message: &str,
        formats: &[ReportFormat],
    ) -> Result<(), CoreError> {
        let token = self.token("emailing a report")?;
        let mut attachments = Vec::with_capacity(formats.len());
        for &format in formats {
            let bytes = self.export(format)?;
            attachments.push(self.report_service.attachment(ATTACHMENT_STEM, format, &bytes));
        }
        let report = self.report_service.email(recipient, message, attachments)?;
        self.api.email_report(&token, &report).await
    }

    pub async fn schedule_report(
        &mut self,
        frequency: Frequency,
        time: &str,
        format: ReportFormat,
        recipient: &str,
    ) -> Result<(), CoreError> {
        let token = self.token("scheduling a report")?;
        let report = self.report_service.schedule(frequency, time, format, recipient)?;
        self.api.schedule_report(&token, &report).await
    }

    // ── Bookmarks ───────────────────────────────────────────────────

    fn bookmark_namespace(&self) -> &'static str {
        self.state.settings.variant.bookmark_namespace()
    }

    /// Save the current filter and chart visibility under `name`.
    pub fn save_bookmark(&mut self, name: &str) -> Result<uuid::Uuid, CoreError> {
        let namespace = self.bookmark_namespace();
        let bookmarks = self.state.bookmarks_in_mut(namespace);
        let bookmark = self
            .bookmark_service
            .save(bookmarks, name, &self.filter, &self.visibility)?;
        self.dirty = true;
        Ok(bookmark.id)
    }

    /// Overwrite an existing bookmark with the current selection.
    pub fn update_bookmark(&mut self, name: &str) -> Result<(), CoreError> {
        let namespace = self.bookmark_namespace();
        let bookmarks = self.state.bookmarks_in_mut(namespace);
        self.bookmark_service
            .update(bookmarks, name, &self.filter, &self.visibility)?;
        self.dirty = true;
        Ok(())
    }

    pub fn rename_bookmark(&mut self, from: &str, to: &str) -> Result<(), CoreError> {
        let namespace = self.bookmark_namespace();
        self.bookmark_service
            .rename(self.state.bookmarks_in_mut(namespace), from, to)?;
        self.dirty = true;
        Ok(())
    }

    pub fn delete_bookmark(&mut self, name: &str) -> Result<(), CoreError> {
        let namespace = self.bookmark_namespace();
        self.bookmark_service
            .delete(self.state.bookmarks_in_mut(namespace), name)?;
        self.dirty = true;
        Ok(())
    }

    /// Restore the filter and chart visibility saved under `name`.
    pub fn apply_bookmark(&mut self, name: &str) -> Result<(), CoreError> {
        let namespace = self.bookmark_namespace();
        let bookmarks = self
            .state
            .bookmarks_in(namespace)
            .ok_or_else(|| CoreError::BookmarkNotFound(name.trim().to_string()))?;
        let (filter, visibility) = self.bookmark_service.apply(bookmarks, name)?;
        self.filter = filter;
        self.visibility = visibility;
        tracing::info!(bookmark = name.trim(), "bookmark applied");
        Ok(())
    }

    /// Bookmarks of the active dashboard variant, ordered by name.
    #[must_use]
    pub fn bookmarks(&self) -> Vec<&Bookmark> {
        self.state
            .bookmarks_in(self.bookmark_namespace())
            .map(|b| self.bookmark_service.list(b))
            .unwrap_or_default()
    }
}
