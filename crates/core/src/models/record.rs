use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One sales transaction row as served by `/api/data` (or `/api/ppdata`).
///
/// Records are immutable once ingested. The `product` field carries whatever
/// the variant uses as its product key (`product_name` on the sales dashboard,
/// `product_id` on the product-performance one), so a single aggregator
/// works for both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction date as sent by the API (usually `YYYY-MM-DD`)
    pub date: String,

    /// Product key (name or id, depending on the dashboard variant)
    pub product: String,

    /// Product category
    pub category: String,

    /// Store the sale happened in
    pub store_name: String,

    /// Customer display name
    pub customer_name: String,

    /// Units sold in this transaction
    pub units_sold: f64,

    /// Revenue in the API's currency
    pub revenue: f64,

    /// Profit in the API's currency (may be negative)
    pub profit: f64,
}

impl TransactionRecord {
    /// Build a record with empty customer/category fields.
    /// Mostly useful for tests and quick fixtures.
    pub fn new(
        date: impl Into<String>,
        product: impl Into<String>,
        store_name: impl Into<String>,
        revenue: f64,
    ) -> Self {
        Self {
            date: date.into(),
            product: product.into(),
            category: String::new(),
            store_name: store_name.into(),
            customer_name: String::new(),
            units_sold: 0.0,
            revenue,
            profit: 0.0,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer_name = customer.into();
        self
    }

    pub fn with_units(mut self, units_sold: f64) -> Self {
        self.units_sold = units_sold;
        self
    }

    pub fn with_profit(mut self, profit: f64) -> Self {
        self.profit = profit;
        self
    }

    /// Normalized date key used for date-grouped aggregations.
    ///
    /// ISO timestamps are reduced to their calendar date so that
    /// `2024-03-01T10:00:00Z` and `2024-03-01` land in the same bucket.
    /// Anything chrono cannot parse is returned unchanged.
    #[must_use]
    pub fn date_key(&self) -> String {
        normalize_date(&self.date)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn normalize_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => raw.to_string(),
    }
}

// ── Wire ingestion ──────────────────────────────────────────────────

/// A record exactly as the API sent it, before validation.
///
/// Every field is loosely typed: ids arrive as numbers on some deployments,
/// money as strings on others.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub product_name: Option<Value>,
    #[serde(default)]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub store_name: Option<Value>,
    #[serde(default)]
    pub customer_name: Option<Value>,
    #[serde(default)]
    pub units_sold: Option<Value>,
    #[serde(default)]
    pub revenue: Option<Value>,
    #[serde(default)]
    pub profit: Option<Value>,
}

/// Why a raw record was refused at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingProduct,
    MissingDate,
    MalformedMetric(&'static str),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingProduct => write!(f, "missing product"),
            RejectReason::MissingDate => write!(f, "missing date"),
            RejectReason::MalformedMetric(field) => write!(f, "malformed {field}"),
        }
    }
}

impl RawRecord {
    /// Validate and convert into a [`TransactionRecord`].
    ///
    /// Metrics must be finite JSON numbers or numeric strings. Anything else
    /// (null, missing, "n/a", NaN) rejects the whole record instead of being
    /// coerced to zero.
    pub fn into_record(self) -> Result<TransactionRecord, RejectReason> {
        let product = self
            .product_name
            .as_ref()
            .and_then(text_of)
            .or_else(|| self.product_id.as_ref().and_then(text_of))
            .filter(|p| !p.is_empty())
            .ok_or(RejectReason::MissingProduct)?;
        let date = self
            .date
            .as_ref()
            .and_then(text_of)
            .filter(|d| !d.is_empty())
            .ok_or(RejectReason::MissingDate)?;

        let units_sold = metric_of(self.units_sold.as_ref())
            .ok_or(RejectReason::MalformedMetric("units_sold"))?;
        let revenue =
            metric_of(self.revenue.as_ref()).ok_or(RejectReason::MalformedMetric("revenue"))?;
        let profit =
            metric_of(self.profit.as_ref()).ok_or(RejectReason::MalformedMetric("profit"))?;

        Ok(TransactionRecord {
            date,
            product,
            category: self.category.as_ref().and_then(text_of).unwrap_or_default(),
            store_name: self.store_name.as_ref().and_then(text_of).unwrap_or_default(),
            customer_name: self.customer_name.as_ref().and_then(text_of).unwrap_or_default(),
            units_sold,
            revenue,
            profit,
        })
    }
}

fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn metric_of(v: Option<&Value>) -> Option<f64> {
    let parsed = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Outcome of ingesting one API payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Records that passed validation
    pub accepted: usize,

    /// Records dropped because of missing keys or malformed metrics
    pub rejected: usize,
}

/// Validate a batch of raw records, keeping wire order for the accepted ones.
pub fn ingest(raw: Vec<RawRecord>) -> (Vec<TransactionRecord>, IngestReport) {
    let mut records = Vec::with_capacity(raw.len());
    let mut report = IngestReport::default();

    for (idx, r) in raw.into_iter().enumerate() {
        match r.into_record() {
            Ok(rec) => {
                records.push(rec);
                report.accepted += 1;
            }
            Err(reason) => {
                tracing::debug!(row = idx, %reason, "dropping record");
                report.rejected += 1;
            }
        }
    }

    if report.rejected > 0 {
        tracing::warn!(
            accepted = report.accepted,
            rejected = report.rejected,
            "some records were rejected during ingestion"
        );
    }

    (records, report)
}
