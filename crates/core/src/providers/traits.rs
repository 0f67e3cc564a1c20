use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::catalog::{ProductOption, StoreOption};
use crate::models::record::RawRecord;
use crate::models::report::{EmailReport, ScheduleReport};

/// The remote dashboard API as the core consumes it.
///
/// The HTTP client implements this; tests and other hosts can plug in
/// their own. Every call except the two logins needs a bearer token.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DashboardApi: Send + Sync {
    /// Human-readable name of this backend (for logs/errors).
    fn name(&self) -> &str;

    /// Exchange credentials for a bearer token.
    async fn login(&self, username: &str, password: &str) -> Result<String, CoreError>;

    /// Exchange an OAuth credential (ID token) for a bearer token.
    async fn login_with_oauth(&self, credential: &str) -> Result<String, CoreError>;

    async fn fetch_products(&self, token: &str) -> Result<Vec<ProductOption>, CoreError>;

    async fn fetch_stores(&self, token: &str) -> Result<Vec<StoreOption>, CoreError>;

    /// The full record set, unvalidated.
    async fn fetch_records(&self, token: &str) -> Result<Vec<RawRecord>, CoreError>;

    async fn email_report(&self, token: &str, report: &EmailReport) -> Result<(), CoreError>;

    async fn schedule_report(&self, token: &str, report: &ScheduleReport) -> Result<(), CoreError>;
}
