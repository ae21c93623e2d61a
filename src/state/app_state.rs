use std::sync::Arc;

use crate::config::{ReportSettings, TrackingSettings};
use crate::db::store::AnalyticsStore;

/// Shared, read-only handler state. Handlers hold no per-request caches.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AnalyticsStore>,
    pub tracking: TrackingSettings,
    pub reports: ReportSettings,
    pub ip_hash_salt: String,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self {
            store,
            tracking: TrackingSettings::default(),
            reports: ReportSettings::default(),
            ip_hash_salt: "storefront_analytics_salt".to_string(),
            cookie_secure: false,
        }
    }
}
