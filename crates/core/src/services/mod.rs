pub mod aggregation_service;
pub mod bookmark_service;
pub mod chart_service;
pub mod export_service;
pub mod report_service;
