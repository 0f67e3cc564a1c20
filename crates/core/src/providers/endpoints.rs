use crate::models::settings::DashboardVariant;

/// Paths of the dashboard API, per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub login: &'static str,
    pub products: &'static str,
    pub stores: &'static str,
    pub data: &'static str,
    pub email: &'static str,
    pub schedule: &'static str,
}

impl Endpoints {
    #[must_use]
    pub fn for_variant(variant: DashboardVariant) -> Self {
        let (products, stores, data) = match variant {
            DashboardVariant::Sales => ("/api/products", "/api/stores", "/api/data"),
            DashboardVariant::ProductPerformance => ("/api/ppproducts", "/api/ppstores", "/api/ppdata"),
        };
        Self {
            login: "/api/login",
            products,
            stores,
            data,
            email: "/api/email_me",
            schedule: "/api/schedule_report",
        }
    }
}

/// Join a base URL and an absolute path without doubling the slash.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
