pub mod bookmark;
pub mod catalog;
pub mod chart;
pub mod filter;
pub mod record;
pub mod report;
pub mod session;
pub mod settings;
pub mod state;
