use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The seven chart types the dashboard can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Doughnut,
    Histogram,
    Treemap,
    Bubble,
}

impl ChartKind {
    /// Every chart kind, in dashboard display order.
    pub const ALL: [ChartKind; 7] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Doughnut,
        ChartKind::Histogram,
        ChartKind::Treemap,
        ChartKind::Bubble,
    ];

    /// Caption used for exports and SVG titles.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Revenue by Product",
            ChartKind::Line => "Revenue over Time",
            ChartKind::Pie => "Revenue by Store",
            ChartKind::Doughnut => "Units Sold by Category",
            ChartKind::Histogram => "Revenue Distribution",
            ChartKind::Treemap => "Revenue by Category and Product",
            ChartKind::Bubble => "Product Profitability",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Doughnut => "doughnut",
            ChartKind::Histogram => "histogram",
            ChartKind::Treemap => "treemap",
            ChartKind::Bubble => "bubble",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown chart kind '{s}'"))
    }
}

/// Numeric column summed by an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Revenue,
    UnitsSold,
    Profit,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Revenue => write!(f, "Revenue"),
            Metric::UnitsSold => write!(f, "Units Sold"),
            Metric::Profit => write!(f, "Profit"),
        }
    }
}

/// Labels + values, the shape consumed by bar, line, pie and doughnut charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesDatum {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl SeriesDatum {
    pub fn new(labels: Vec<String>, values: Vec<f64>) -> Self {
        Self { labels, values }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() || self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len().min(self.values.len())
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Iterate `(label, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// A node of the treemap hierarchy.
///
/// Leaves carry a `value`; inner nodes derive theirs from their children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn leaf(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            children: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, children: Vec<HierarchyNode>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total weight: the leaf value, or the sum over children.
    #[must_use]
    pub fn weight(&self) -> f64 {
        if self.is_leaf() {
            self.value.unwrap_or(0.0)
        } else {
            self.children.iter().map(HierarchyNode::weight).sum()
        }
    }

    /// Direct child called `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&HierarchyNode> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Per-entity multi-metric rollup used by the bubble chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRollup {
    pub name: String,
    pub revenue: f64,
    pub profit: f64,
    pub units_sold: f64,
}

/// Renderer-ready data for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChartDatum {
    Series(SeriesDatum),
    Distribution(Vec<f64>),
    Hierarchy(HierarchyNode),
    Rollups(Vec<EntityRollup>),
}

impl ChartDatum {
    /// `true` when the renderer should show its placeholder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            ChartDatum::Series(s) => s.is_empty(),
            ChartDatum::Distribution(v) => v.is_empty(),
            ChartDatum::Hierarchy(h) => h.children.is_empty(),
            ChartDatum::Rollups(r) => r.is_empty(),
        }
    }
}

/// Which charts are shown. Missing entries count as visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartVisibility(pub BTreeMap<ChartKind, bool>);

impl ChartVisibility {
    pub fn all_visible() -> Self {
        Self(ChartKind::ALL.into_iter().map(|k| (k, true)).collect())
    }

    #[must_use]
    pub fn is_visible(&self, kind: ChartKind) -> bool {
        self.0.get(&kind).copied().unwrap_or(true)
    }

    pub fn set(&mut self, kind: ChartKind, visible: bool) {
        self.0.insert(kind, visible);
    }

    /// Visible kinds, in display order.
    #[must_use]
    pub fn visible(&self) -> Vec<ChartKind> {
        ChartKind::ALL
            .into_iter()
            .filter(|k| self.is_visible(*k))
            .collect()
    }
}

impl Default for ChartVisibility {
    fn default() -> Self {
        Self::all_visible()
    }
}
