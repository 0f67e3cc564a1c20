use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Default polling period of the live dashboard, in seconds.
pub const DEFAULT_REFRESH_SECS: u64 = 60;

/// Default number of histogram buckets.
pub const DEFAULT_HISTOGRAM_BINS: usize = 12;

/// Upper bound for histogram buckets; more than this is unreadable.
pub const MAX_HISTOGRAM_BINS: usize = 100;

/// Which dashboard flavour the core talks to.
///
/// The two variants expose the same record shape under different endpoints
/// and keep their bookmarks in separate namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DashboardVariant {
    /// Sales dashboard (`/api/products`, `/api/stores`, `/api/data`)
    Sales,
    /// Product-performance dashboard (`/api/ppproducts`, `/api/ppstores`, `/api/ppdata`)
    ProductPerformance,
}

impl DashboardVariant {
    /// Key of the bookmark map for this variant in the client state.
    #[must_use]
    pub fn bookmark_namespace(&self) -> &'static str {
        match self {
            DashboardVariant::Sales => "bi_dashboard_bookmarks",
            DashboardVariant::ProductPerformance => "pp_dashboard_bookmarks",
        }
    }
}

impl std::fmt::Display for DashboardVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DashboardVariant::Sales => write!(f, "sales"),
            DashboardVariant::ProductPerformance => write!(f, "pp"),
        }
    }
}

impl std::str::FromStr for DashboardVariant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sales" | "bi" => Ok(DashboardVariant::Sales),
            "pp" | "product-performance" | "product_performance" => {
                Ok(DashboardVariant::ProductPerformance)
            }
            other => Err(CoreError::ValidationError(format!(
                "Unknown dashboard variant '{other}' (expected 'sales' or 'pp')"
            ))),
        }
    }
}

/// Runtime configuration, stored inside the encrypted client-state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the dashboard API, without trailing slash.
    /// Empty means "same origin" (relative URLs).
    pub api_base_url: String,

    /// Which endpoint family and bookmark namespace to use
    pub variant: DashboardVariant,

    /// How often a live host should re-fetch records
    pub refresh_interval_secs: u64,

    /// Bucket count for the revenue histogram
    pub histogram_bins: usize,

    /// Default chart surface width in pixels
    pub chart_width: f64,

    /// Default chart surface height in pixels
    pub chart_height: f64,

    /// HTTP request timeout (native only)
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            variant: DashboardVariant::Sales,
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            chart_width: 640.0,
            chart_height: 400.0,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Defaults overlaid with `BI_DASHBOARD_*` environment variables.
    ///
    /// Unparseable values are rejected rather than ignored so a typo in the
    /// environment is visible at startup.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] but with an injectable lookup (for tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let mut settings = Self::default();

        if let Some(url) = lookup("BI_DASHBOARD_API_URL") {
            settings.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(variant) = lookup("BI_DASHBOARD_VARIANT") {
            settings.variant = variant.parse()?;
        }
        if let Some(secs) = lookup("BI_DASHBOARD_REFRESH_SECS") {
            settings.refresh_interval_secs = secs.trim().parse().map_err(|_| {
                CoreError::ValidationError(format!("BI_DASHBOARD_REFRESH_SECS is not a number: '{secs}'"))
            })?;
        }
        if let Some(bins) = lookup("BI_DASHBOARD_HISTOGRAM_BINS") {
            settings.histogram_bins = bins.trim().parse().map_err(|_| {
                CoreError::ValidationError(format!("BI_DASHBOARD_HISTOGRAM_BINS is not a number: '{bins}'"))
            })?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Bounds-check every field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.refresh_interval_secs == 0 {
            return Err(CoreError::ValidationError(
                "refresh interval must be at least 1 second".into(),
            ));
        }
        if !(1..=MAX_HISTOGRAM_BINS).contains(&self.histogram_bins) {
            return Err(CoreError::ValidationError(format!(
                "histogram bins must be between 1 and {MAX_HISTOGRAM_BINS}, got {}",
                self.histogram_bins
            )));
        }
        if !(self.chart_width >= 100.0 && self.chart_height >= 100.0)
            || !self.chart_width.is_finite()
            || !self.chart_height.is_finite()
        {
            return Err(CoreError::ValidationError(format!(
                "chart size must be at least 100x100, got {}x{}",
                self.chart_width, self.chart_height
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::ValidationError(
                "request timeout must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}
