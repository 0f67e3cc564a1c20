use serde::{Deserialize, Serialize};

use super::record::TransactionRecord;

/// Current product/store selection.
///
/// An empty string means "no filter on this dimension", matching the
/// "All Products" / "All Stores" entries of the selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    pub product: String,
    pub store: String,
}

impl FilterState {
    pub fn new(product: impl Into<String>, store: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            store: store.into(),
        }
    }

    /// No filtering on either dimension.
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.product.is_empty() && self.store.is_empty()
    }

    /// The filter predicate.
    #[must_use]
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        (self.product.is_empty() || record.product == self.product)
            && (self.store.is_empty() || record.store_name == self.store)
    }

    /// Borrowing view over the records that pass the filter, in original order.
    pub fn apply<'a>(&self, records: &'a [TransactionRecord]) -> Vec<&'a TransactionRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}
