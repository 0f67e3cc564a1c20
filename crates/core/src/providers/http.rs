use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use super::endpoints::{join_url, Endpoints};
use super::traits::DashboardApi;
use crate::errors::CoreError;
use crate::models::catalog::{ProductOption, StoreOption};
use crate::models::record::RawRecord;
use crate::models::report::{EmailReport, ScheduleReport};
use crate::models::settings::{DashboardVariant, Settings};

/// Longest slice of an error body carried into `CoreError::Api`.
const MAX_ERROR_BODY: usize = 200;

/// reqwest client for the dashboard API.
///
/// - **Auth**: `POST /api/login` returns `{ "access_token": "..." }`;
///   everything else sends `Authorization: Bearer <token>`.
/// - **Data**: products, stores and records per dashboard variant.
/// - **Reports**: `POST /api/email_me`, `POST /api/schedule_report`.
pub struct HttpDashboardApi {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
struct PasswordLogin<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct OAuthLogin<'a> {
    credential: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "token")]
    access_token: String,
}

/// `/api/data` answers with a bare array on some deployments and with
/// `{ "data": [...] }` on others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordsPayload {
    List(Vec<RawRecord>),
    Wrapped { data: Vec<RawRecord> },
}

impl HttpDashboardApi {
    pub fn new(base_url: impl Into<String>, variant: DashboardVariant) -> Self {
        Self::with_timeout(base_url, variant, 30)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_timeout(
            settings.api_base_url.clone(),
            settings.variant,
            settings.request_timeout_secs,
        )
    }

    #[cfg_attr(target_arch = "wasm32", allow(unused_variables))]
    pub fn with_timeout(base_url: impl Into<String>, variant: DashboardVariant, timeout_secs: u64) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs.max(1)));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
            endpoints: Endpoints::for_variant(variant),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, CoreError> {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?;
        let resp = check_status(path, resp).await?;
        resp.json::<T>().await.map_err(|e| CoreError::Api {
            endpoint: path.to_string(),
            status: 200,
            message: format!("Unexpected response body: {e}"),
        })
    }

    async fn post_json<B>(&self, path: &str, token: Option<&str>, body: &B) -> Result<Response, CoreError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;
        check_status(path, resp).await
    }

    async fn token_from(&self, path: &str, resp: Response) -> Result<String, CoreError> {
        let body: TokenResponse = resp.json().await.map_err(|e| CoreError::Api {
            endpoint: path.to_string(),
            status: 200,
            message: format!("Login response carried no token: {e}"),
        })?;
        if body.access_token.trim().is_empty() {
            return Err(CoreError::Api {
                endpoint: path.to_string(),
                status: 200,
                message: "Login response carried an empty token".into(),
            });
        }
        Ok(body.access_token)
    }
}

/// Turn non-2xx responses into `CoreError::Api` with a short body excerpt.
async fn check_status(endpoint: &str, resp: Response) -> Result<Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message: String = body.chars().take(MAX_ERROR_BODY).collect();
    tracing::warn!(endpoint, status = status.as_u16(), "dashboard API request failed");
    Err(CoreError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            message
        },
    })
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl DashboardApi for HttpDashboardApi {
    fn name(&self) -> &str {
        "http"
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, CoreError> {
        let path = self.endpoints.login;
        let resp = self
            .post_json(path, None, &PasswordLogin { username, password })
            .await?;
        let token = self.token_from(path, resp).await?;
        tracing::info!(user = username, "logged in");
        Ok(token)
    }

    async fn login_with_oauth(&self, credential: &str) -> Result<String, CoreError> {
        let path = self.endpoints.login;
        let resp = self.post_json(path, None, &OAuthLogin { credential }).await?;
        let token = self.token_from(path, resp).await?;
        tracing::info!("logged in with oauth credential");
        Ok(token)
    }

    async fn fetch_products(&self, token: &str) -> Result<Vec<ProductOption>, CoreError> {
        self.get_json(self.endpoints.products, token).await
    }

    async fn fetch_stores(&self, token: &str) -> Result<Vec<StoreOption>, CoreError> {
        self.get_json(self.endpoints.stores, token).await
    }

    async fn fetch_records(&self, token: &str) -> Result<Vec<RawRecord>, CoreError> {
        let payload: RecordsPayload = self.get_json(self.endpoints.data, token).await?;
        let records = match payload {
            RecordsPayload::List(records) | RecordsPayload::Wrapped { data: records } => records,
        };
        tracing::info!(rows = records.len(), endpoint = self.endpoints.data, "fetched records");
        Ok(records)
    }

    async fn email_report(&self, token: &str, report: &EmailReport) -> Result<(), CoreError> {
        self.post_json(self.endpoints.email, Some(token), report).await?;
        tracing::info!(
            attachments = report.attachments.len(),
            "report emailed"
        );
        Ok(())
    }

    async fn schedule_report(&self, token: &str, report: &ScheduleReport) -> Result<(), CoreError> {
        self.post_json(self.endpoints.schedule, Some(token), report).await?;
        tracing::info!(frequency = ?report.frequency, time = %report.time, "report scheduled");
        Ok(())
    }
}
