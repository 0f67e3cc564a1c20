use std::collections::HashMap;

use crate::models::chart::{EntityRollup, HierarchyNode, Metric, SeriesDatum};
use crate::models::record::TransactionRecord;

/// Column a record set can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Product,
    Store,
    Category,
    Customer,
    /// Normalized calendar date (see `TransactionRecord::date_key`)
    Date,
}

impl Dimension {
    /// Key selector for this dimension.
    ///
    /// Dates are normalized first, so the key is owned.
    #[must_use]
    pub fn key_of(&self, record: &TransactionRecord) -> String {
        match self {
            Dimension::Product => record.product.clone(),
            Dimension::Store => record.store_name.clone(),
            Dimension::Category => record.category.clone(),
            Dimension::Customer => record.customer_name.clone(),
            Dimension::Date => record.date_key(),
        }
    }
}

/// Value of `metric` on one record.
#[must_use]
pub fn metric_of(record: &TransactionRecord, metric: Metric) -> f64 {
    match metric {
        Metric::Revenue => record.revenue,
        Metric::UnitsSold => record.units_sold,
        Metric::Profit => record.profit,
    }
}

/// Headline numbers over a record set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricTotals {
    pub records: usize,
    pub revenue: f64,
    pub profit: f64,
    pub units_sold: f64,
}

/// Group-by/sum transformations feeding the chart renderers.
///
/// Pure functions over a filtered view; nothing here can fail. Group order
/// is first-seen order unless stated otherwise.
pub struct AggregationService;

impl AggregationService {
    pub fn new() -> Self {
        Self
    }

    /// Group by an arbitrary key selector and sum `metric` per group.
    ///
    /// Labels are the distinct keys in first-seen order; `values[i]` is the
    /// sum over the records whose key equals `labels[i]`.
    pub fn group_sum<F>(&self, records: &[&TransactionRecord], key: F, metric: Metric) -> SeriesDatum
    where
        F: Fn(&TransactionRecord) -> String,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut labels: Vec<String> = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        for record in records {
            let k = key(*record);
            let value = metric_of(record, metric);
            match index.get(&k) {
                Some(&i) => values[i] += value,
                None => {
                    index.insert(k.clone(), labels.len());
                    labels.push(k);
                    values.push(value);
                }
            }
        }

        tracing::debug!(groups = labels.len(), rows = records.len(), %metric, "grouped records");
        SeriesDatum::new(labels, values)
    }

    /// Group by one of the built-in dimensions.
    ///
    /// Date grouping sorts labels lexicographically (ISO dates sort
    /// chronologically as strings); every other dimension keeps first-seen order.
    pub fn group_by(&self, records: &[&TransactionRecord], dimension: Dimension, metric: Metric) -> SeriesDatum {
        match dimension {
            Dimension::Date => self.group_sum_by_date(records, metric),
            dim => self.group_sum(records, |r| dim.key_of(r), metric),
        }
    }

    /// Sum `metric` per calendar date, labels sorted ascending.
    pub fn group_sum_by_date(&self, records: &[&TransactionRecord], metric: Metric) -> SeriesDatum {
        let grouped = self.group_sum(records, TransactionRecord::date_key, metric);
        let mut pairs: Vec<(String, f64)> = grouped.labels.into_iter().zip(grouped.values).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let (labels, values) = pairs.into_iter().unzip();
        SeriesDatum::new(labels, values)
    }

    /// Raw metric values, one per record, for histogram binning.
    pub fn metric_values(&self, records: &[&TransactionRecord], metric: Metric) -> Vec<f64> {
        records.iter().map(|r| metric_of(r, metric)).collect()
    }

    /// Two-level category → product hierarchy for the treemap.
    ///
    /// Groups are summed first and empty groups dropped afterwards, so every
    /// leaf ends up with `value > 0` and every category with at least one
    /// product.
    pub fn category_product_tree(&self, records: &[&TransactionRecord], metric: Metric) -> HierarchyNode {
        let mut category_index: HashMap<&str, usize> = HashMap::new();
        let mut categories: Vec<(&str, Vec<&TransactionRecord>)> = Vec::new();

        for record in records {
            let cat = record.category.as_str();
            match category_index.get(cat) {
                Some(&i) => categories[i].1.push(*record),
                None => {
                    category_index.insert(cat, categories.len());
                    categories.push((cat, vec![*record]));
                }
            }
        }

        let children: Vec<HierarchyNode> = categories
            .into_iter()
            .filter_map(|(cat, rows)| {
                let products = self.group_sum(&rows, |r| r.product.clone(), metric);
                let leaves: Vec<HierarchyNode> = products
                    .iter()
                    .filter(|(_, v)| *v > 0.0)
                    .map(|(name, v)| HierarchyNode::leaf(name, v))
                    .collect();
                if leaves.is_empty() {
                    None
                } else {
                    let name = if cat.is_empty() { "Uncategorized" } else { cat };
                    Some(HierarchyNode::branch(name, leaves))
                }
            })
            .collect();

        HierarchyNode::branch("All", children)
    }

    /// Per-entity rollups of revenue, profit and units over the same partition.
    pub fn entity_rollups<F>(&self, records: &[&TransactionRecord], key: F) -> Vec<EntityRollup>
    where
        F: Fn(&TransactionRecord) -> String,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut rollups: Vec<EntityRollup> = Vec::new();

        for record in records {
            let k = key(*record);
            let i = match index.get(&k) {
                Some(&i) => i,
                None => {
                    index.insert(k.clone(), rollups.len());
                    rollups.push(EntityRollup {
                        name: k,
                        revenue: 0.0,
                        profit: 0.0,
                        units_sold: 0.0,
                    });
                    rollups.len() - 1
                }
            };
            let entry = &mut rollups[i];
            entry.revenue += record.revenue;
            entry.profit += record.profit;
            entry.units_sold += record.units_sold;
        }

        rollups
    }

    /// Totals over the whole view.
    pub fn totals(&self, records: &[&TransactionRecord]) -> MetricTotals {
        records.iter().fold(
            MetricTotals {
                records: records.len(),
                ..MetricTotals::default()
            },
            |mut acc, r| {
                acc.revenue += r.revenue;
                acc.profit += r.profit;
                acc.units_sold += r.units_sold;
                acc
            },
        )
    }

}

impl Default for AggregationService {
    fn default() -> Self {
        Self::new()
    }
}
