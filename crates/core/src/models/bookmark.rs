use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chart::ChartVisibility;
use super::filter::FilterState;

/// A named snapshot of the filter selection and chart visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Stable identifier; survives renames
    pub id: Uuid,

    /// Display name, unique within its namespace
    pub name: String,

    /// Selected product ("" = all)
    pub product: String,

    /// Selected store ("" = all)
    pub store: String,

    /// Per-chart visibility at the time of saving
    pub charts: ChartVisibility,
}

impl Bookmark {
    pub fn new(name: impl Into<String>, filter: &FilterState, charts: &ChartVisibility) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            product: filter.product.clone(),
            store: filter.store.clone(),
            charts: charts.clone(),
        }
    }

    /// The filter this bookmark restores.
    #[must_use]
    pub fn filter(&self) -> FilterState {
        FilterState::new(self.product.clone(), self.store.clone())
    }
}
