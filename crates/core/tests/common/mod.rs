// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use bi_dashboard_core::errors::CoreError;
use bi_dashboard_core::models::catalog::{ProductOption, StoreOption};
use bi_dashboard_core::models::record::{RawRecord, TransactionRecord};
use bi_dashboard_core::models::report::{EmailReport, ScheduleReport};
use bi_dashboard_core::providers::traits::DashboardApi;
use bi_dashboard_core::render::raster::Rasterizer;

/// JWT whose payload is `{"name":"Ada","email":"ada@example.com","exp":4102444800}`.
pub const TOKEN: &str =
    "eyJhbGciOiJIUzI1NiJ9.eyJuYW1lIjoiQWRhIiwiZW1haWwiOiJhZGFAZXhhbXBsZS5jb20iLCJleHAiOjQxMDI0NDQ4MDB9.sig";

/// The three records used throughout: A/X 100, B/Y 50, A/Y 25.
pub fn sample_records() -> Vec<TransactionRecord> {
    vec![
        TransactionRecord::new("2024-01-01", "A", "X", 100.0)
            .with_category("Drinks")
            .with_units(4.0)
            .with_profit(30.0),
        TransactionRecord::new("2024-01-02", "B", "Y", 50.0)
            .with_category("Snacks")
            .with_units(10.0)
            .with_profit(5.0),
        TransactionRecord::new("2024-01-01", "A", "Y", 25.0)
            .with_category("Drinks")
            .with_units(1.0)
            .with_profit(8.0),
    ]
}

pub fn refs(records: &[TransactionRecord]) -> Vec<&TransactionRecord> {
    records.iter().collect()
}

/// The same three records as the API would send them.
pub fn sample_raw() -> Vec<RawRecord> {
    serde_json::from_value(json!([
        { "date": "2024-01-01", "product_name": "A", "category": "Drinks", "store_name": "X",
          "customer_name": "Cy", "units_sold": 4, "revenue": 100.0, "profit": 30 },
        { "date": "2024-01-02", "product_name": "B", "category": "Snacks", "store_name": "Y",
          "customer_name": "Di", "units_sold": "10", "revenue": "50", "profit": 5 },
        { "date": "2024-01-01T09:30:00Z", "product_name": "A", "category": "Drinks", "store_name": "Y",
          "customer_name": "Ed", "units_sold": 1, "revenue": 25, "profit": 8 }
    ]))
    .unwrap()
}

/// What the mock API saw.
#[derive(Debug, Default)]
pub struct Calls {
    pub tokens: Vec<String>,
    pub emails: Vec<EmailReport>,
    pub schedules: Vec<ScheduleReport>,
}

/// In-memory `DashboardApi`.
pub struct MockApi {
    pub records: Mutex<Result<Vec<RawRecord>, String>>,
    pub calls: Arc<Mutex<Calls>>,
    pub reject_login: bool,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Ok(sample_raw())),
            calls: Arc::new(Mutex::new(Calls::default())),
            reject_login: false,
        }
    }

    pub fn failing_records() -> Self {
        let api = Self::new();
        *api.records.lock().unwrap() = Err("connection reset".into());
        api
    }

    pub fn calls(&self) -> Arc<Mutex<Calls>> {
        Arc::clone(&self.calls)
    }

    fn seen(&self, token: &str) {
        self.calls.lock().unwrap().tokens.push(token.to_string());
    }
}

#[async_trait]
impl DashboardApi for MockApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, CoreError> {
        if self.reject_login || password != "secret" {
            return Err(CoreError::Api {
                endpoint: "/api/login".into(),
                status: 401,
                message: format!("bad credentials for {username}"),
            });
        }
        Ok(TOKEN.to_string())
    }

    async fn login_with_oauth(&self, credential: &str) -> Result<String, CoreError> {
        if credential == "expired" {
            return Err(CoreError::Api {
                endpoint: "/api/login".into(),
                status: 401,
                message: "expired credential".into(),
            });
        }
        Ok(TOKEN.to_string())
    }

    async fn fetch_products(&self, token: &str) -> Result<Vec<ProductOption>, CoreError> {
        self.seen(token);
        Ok(serde_json::from_value(json!([
            { "product_id": 1, "product_name": "A" },
            { "product_id": "2", "product_name": "B" }
        ]))?)
    }

    async fn fetch_stores(&self, token: &str) -> Result<Vec<StoreOption>, CoreError> {
        self.seen(token);
        Ok(serde_json::from_value(json!([
            { "store_id": 7, "store_name": "X" },
            { "store_id": 8, "store_name": "Y" }
        ]))?)
    }

    async fn fetch_records(&self, token: &str) -> Result<Vec<RawRecord>, CoreError> {
        self.seen(token);
        self.records
            .lock()
            .unwrap()
            .clone()
            .map_err(CoreError::Network)
    }

    async fn email_report(&self, token: &str, report: &EmailReport) -> Result<(), CoreError> {
        self.seen(token);
        self.calls.lock().unwrap().emails.push(report.clone());
        Ok(())
    }

    async fn schedule_report(&self, token: &str, report: &ScheduleReport) -> Result<(), CoreError> {
        self.seen(token);
        self.calls.lock().unwrap().schedules.push(report.clone());
        Ok(())
    }
}

/// Returns the same 1x1 PNG for every chart.
pub struct FakeRasterizer;

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, _svg: &str, _width: u32, _height: u32) -> Result<Vec<u8>, CoreError> {
        Ok(tiny_png())
    }
}

/// Fails for every chart.
pub struct FailingRasterizer;

impl Rasterizer for FailingRasterizer {
    fn rasterize(&self, _svg: &str, _width: u32, _height: u32) -> Result<Vec<u8>, CoreError> {
        Err(CoreError::Rasterization {
            chart: "unknown".into(),
            message: "no fonts".into(),
        })
    }
}

/// A valid 1x1 white PNG.
pub fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53,
        0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8, 0xFF, 0xFF, 0x3F,
        0x00, 0x05, 0xFE, 0x02, 0xFE, 0x0D, 0xEF, 0x46, 0xB8, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E,
        0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}
