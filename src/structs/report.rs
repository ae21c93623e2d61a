use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::traffic::TrafficSource;

#[derive(Deserialize, Debug)]
pub struct ReportQuery {
    pub period: Option<u32>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period: u32,
    pub overview: Overview,
    pub daily_data: Vec<DailyPoint>,
    pub popular_pages: Vec<PopularPage>,
    pub traffic_sources: Vec<TrafficSourceShare>,
    pub device_data: Vec<DeviceShare>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_pageviews: usize,
    pub total_visitors: usize,
    pub avg_session_duration: f64, // Milliseconds
    pub bounce_rate: f64,          // Percent, one decimal
    pub pageviews_growth: f64,
    pub visitors_growth: f64,
    pub duration_growth: f64,
    pub bounce_rate_growth: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub pageviews: usize,
    pub visitors: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopularPage {
    pub url: String,
    pub title: Option<String>,
    pub views: usize,
    pub avg_time: f64, // Milliseconds, finalized visits only
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrafficSourceShare {
    pub source: TrafficSource,
    pub visits: usize,
    pub percentage: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviceShare {
    pub device: String,
    pub percentage: f64,
}
