use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::errors::CoreError;
use crate::models::chart::{ChartDatum, ChartKind, HierarchyNode, Metric};
use crate::models::record::TransactionRecord;
use crate::render::scene::Surface;
use crate::render::{render_chart, RenderOptions, RenderOutcome};
use crate::services::aggregation_service::{AggregationService, Dimension};

/// Change-detection key of one chart render.
///
/// Hash of the chart kind, the surface size and the full datum. Two renders
/// with equal keys draw identical marks, so the second one can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey(pub u64);

impl RenderKey {
    pub fn new(kind: ChartKind, width: f64, height: f64, datum: &ChartDatum) -> Self {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        width.to_bits().hash(&mut hasher);
        height.to_bits().hash(&mut hasher);
        hash_datum(datum, &mut hasher);
        RenderKey(hasher.finish())
    }

    /// Mix extra view state (e.g. the treemap zoom path) into the key.
    #[must_use]
    pub fn with_context(self, context: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        context.hash(&mut hasher);
        RenderKey(hasher.finish())
    }
}

fn hash_datum<H: Hasher>(datum: &ChartDatum, state: &mut H) {
    match datum {
        ChartDatum::Series(s) => {
            0u8.hash(state);
            s.labels.hash(state);
            hash_floats(&s.values, state);
        }
        ChartDatum::Distribution(values) => {
            1u8.hash(state);
            hash_floats(values, state);
        }
        ChartDatum::Hierarchy(root) => {
            2u8.hash(state);
            hash_node(root, state);
        }
        ChartDatum::Rollups(rollups) => {
            3u8.hash(state);
            rollups.len().hash(state);
            for r in rollups {
                r.name.hash(state);
                hash_floats(&[r.revenue, r.profit, r.units_sold], state);
            }
        }
    }
}

fn hash_floats<H: Hasher>(values: &[f64], state: &mut H) {
    values.len().hash(state);
    for v in values {
        v.to_bits().hash(state);
    }
}

fn hash_node<H: Hasher>(node: &HierarchyNode, state: &mut H) {
    node.name.hash(state);
    node.value.map(f64::to_bits).hash(state);
    node.children.len().hash(state);
    for child in &node.children {
        hash_node(child, state);
    }
}

/// Builds chart-ready data from the filtered record view and decides which
/// charts actually need a redraw.
///
/// The core computes all the numbers; a host only displays the result.
/// Each chart kind has a fixed question it answers (see `ChartKind::title`).
pub struct ChartService {
    aggregation: AggregationService,
    last_keys: HashMap<ChartKind, RenderKey>,
}

impl ChartService {
    pub fn new() -> Self {
        Self {
            aggregation: AggregationService::new(),
            last_keys: HashMap::new(),
        }
    }

    #[must_use]
    pub fn aggregation(&self) -> &AggregationService {
        &self.aggregation
    }

    /// Derive the datum for one chart from the filtered view.
    ///
    /// - Bar: revenue by product
    /// - Line: revenue by date, dates ascending
    /// - Pie: revenue by store
    /// - Doughnut: units sold by category
    /// - Histogram: raw revenue values
    /// - Treemap: revenue by category, then product
    /// - Bubble: revenue/profit/units per product
    pub fn build_datum(&self, kind: ChartKind, records: &[&TransactionRecord]) -> ChartDatum {
        let agg = &self.aggregation;
        match kind {
            ChartKind::Bar => ChartDatum::Series(agg.group_by(records, Dimension::Product, Metric::Revenue)),
            ChartKind::Line => ChartDatum::Series(agg.group_by(records, Dimension::Date, Metric::Revenue)),
            ChartKind::Pie => ChartDatum::Series(agg.group_by(records, Dimension::Store, Metric::Revenue)),
            ChartKind::Doughnut => {
                ChartDatum::Series(agg.group_by(records, Dimension::Category, Metric::UnitsSold))
            }
            ChartKind::Histogram => ChartDatum::Distribution(agg.metric_values(records, Metric::Revenue)),
            ChartKind::Treemap => ChartDatum::Hierarchy(agg.category_product_tree(records, Metric::Revenue)),
            ChartKind::Bubble => ChartDatum::Rollups(agg.entity_rollups(records, |r| r.product.clone())),
        }
    }

    /// `true` when `key` differs from the last key rendered for `kind`.
    #[must_use]
    pub fn needs_render(&self, kind: ChartKind, key: RenderKey) -> bool {
        self.last_keys.get(&kind) != Some(&key)
    }

    pub fn mark_rendered(&mut self, kind: ChartKind, key: RenderKey) {
        self.last_keys.insert(kind, key);
    }

    /// Forget the last key so the next render of `kind` always draws.
    pub fn invalidate(&mut self, kind: ChartKind) {
        self.last_keys.remove(&kind);
    }

    pub fn invalidate_all(&mut self) {
        self.last_keys.clear();
    }

    /// Render `datum` only if it (or the surface size) changed since the
    /// last render of `kind`. Returns `None` when the render was skipped.
    pub fn render_if_changed(
        &mut self,
        kind: ChartKind,
        surface: &mut Surface,
        datum: &ChartDatum,
        options: RenderOptions,
    ) -> Result<Option<RenderOutcome>, CoreError> {
        let key = RenderKey::new(kind, surface.width(), surface.height(), datum);
        if !self.needs_render(kind, key) {
            tracing::debug!(%kind, "render skipped, key unchanged");
            return Ok(None);
        }
        let outcome = render_chart(surface, kind, datum, options)?;
        self.mark_rendered(kind, key);
        Ok(Some(outcome))
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}
