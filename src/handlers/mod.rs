pub mod health_handlers;
pub mod report_handlers;
pub mod tracking_handlers;
