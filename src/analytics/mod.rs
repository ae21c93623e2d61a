//! Reporting KPIs over rolling windows of stored page visits.

pub mod metrics;
pub mod report;
pub mod traffic;
pub mod window;
