use anyhow::Result;
use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::analytics::metrics::{WindowTotals, average_duration, growth, percentage};
use crate::analytics::traffic::TrafficSource;
use crate::analytics::window::ReportWindow;
use crate::db::store::AnalyticsStore;
use crate::models::device::DeviceType;
use crate::models::page_visit::PageVisit;
use crate::models::visitor::Visitor;
use crate::structs::report::{
    AnalyticsReport, DailyPoint, DeviceShare, Overview, PopularPage, TrafficSourceShare,
};
use crate::utils::time::day_of;

/// Share (percent) the Unknown device bucket must exceed to be reported.
pub const UNKNOWN_DEVICE_FLOOR_PCT: f64 = 1.0;

/// Load both windows and build the report. The scans are independent reads;
/// rows landing between them can make metrics disagree slightly.
pub async fn generate_report(
    store: &dyn AnalyticsStore,
    now: i64,
    period_days: u32,
    popular_limit: usize,
) -> Result<AnalyticsReport> {
    let window = ReportWindow::ending_at(now, period_days);
    let previous_window = window.previous();

    let current = store.page_visits_between(window.start, window.end).await?;
    let previous = store
        .page_visits_between(previous_window.start, previous_window.end)
        .await?;

    let visitor_ids: Vec<ObjectId> = current
        .iter()
        .map(|v| v.visitor_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let visitors = store.visitors_by_ids(&visitor_ids).await?;

    log::debug!(
        "Building {}-day report from {} current and {} previous visits",
        period_days,
        current.len(),
        previous.len()
    );

    Ok(build_report(
        &window,
        &current,
        &previous,
        &visitors,
        popular_limit,
    ))
}

pub fn build_report(
    window: &ReportWindow,
    current: &[PageVisit],
    previous: &[PageVisit],
    visitors: &[Visitor],
    popular_limit: usize,
) -> AnalyticsReport {
    let now_totals = WindowTotals::from_visits(current);
    let before = WindowTotals::from_visits(previous);

    let overview = Overview {
        total_pageviews: now_totals.pageviews,
        total_visitors: now_totals.visitors,
        avg_session_duration: now_totals.avg_duration,
        bounce_rate: now_totals.bounce_rate,
        pageviews_growth: growth(now_totals.pageviews as f64, before.pageviews as f64),
        visitors_growth: growth(now_totals.visitors as f64, before.visitors as f64),
        duration_growth: growth(now_totals.avg_duration, before.avg_duration),
        bounce_rate_growth: growth(now_totals.bounce_rate, before.bounce_rate),
    };

    AnalyticsReport {
        period: window.period_days,
        overview,
        daily_data: daily_series(window, current),
        popular_pages: popular_pages(current, popular_limit),
        traffic_sources: traffic_sources(current),
        device_data: device_breakdown(current, visitors),
    }
}

/// One bucket per calendar day of the window, zero-activity days included.
pub fn daily_series(window: &ReportWindow, visits: &[PageVisit]) -> Vec<DailyPoint> {
    let mut buckets: BTreeMap<NaiveDate, (usize, HashSet<ObjectId>)> = window
        .days()
        .into_iter()
        .map(|day| (day, (0, HashSet::new())))
        .collect();

    for visit in visits.iter().filter(|v| window.contains(v.timestamp)) {
        if let Some((views, visitors)) = buckets.get_mut(&day_of(visit.timestamp)) {
            *views += 1;
            visitors.insert(visit.visitor_id);
        }
    }

    buckets
        .into_iter()
        .map(|(date, (pageviews, visitors))| DailyPoint {
            date,
            pageviews,
            visitors: visitors.len(),
        })
        .collect()
}

pub fn popular_pages(visits: &[PageVisit], limit: usize) -> Vec<PopularPage> {
    let mut by_url: HashMap<&str, Vec<&PageVisit>> = HashMap::new();
    for visit in visits {
        by_url.entry(visit.url.as_str()).or_default().push(visit);
    }

    let mut pages: Vec<PopularPage> = by_url
        .into_iter()
        .map(|(url, group)| {
            let title = group
                .iter()
                .filter(|v| v.page_title.is_some())
                .max_by_key(|v| v.timestamp)
                .and_then(|v| v.page_title.clone());

            PopularPage {
                url: url.to_string(),
                title,
                views: group.len(),
                avg_time: average_duration(group.iter().copied()),
            }
        })
        .collect();

    pages.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.url.cmp(&b.url)));
    pages.truncate(limit);
    pages
}

pub fn traffic_sources(visits: &[PageVisit]) -> Vec<TrafficSourceShare> {
    let mut counts: HashMap<TrafficSource, usize> = HashMap::new();
    for visit in visits {
        *counts
            .entry(TrafficSource::classify(visit.referrer.as_deref()))
            .or_default() += 1;
    }

    let mut shares: Vec<TrafficSourceShare> = TrafficSource::all()
        .into_iter()
        .filter_map(|source| {
            let count = counts.get(&source).copied().unwrap_or(0);
            (count > 0).then(|| TrafficSourceShare {
                source,
                visits: count,
                percentage: percentage(count, visits.len()),
            })
        })
        .collect();

    // Stable sort keeps the canonical order among equal counts
    shares.sort_by(|a, b| b.visits.cmp(&a.visits));
    shares
}

/// Share of distinct in-window visitors per device class.
pub fn device_breakdown(visits: &[PageVisit], visitors: &[Visitor]) -> Vec<DeviceShare> {
    let active: HashSet<ObjectId> = visits.iter().map(|v| v.visitor_id).collect();

    let mut counts: HashMap<DeviceType, usize> = HashMap::new();
    let mut total = 0;
    for visitor in visitors {
        if visitor.id.is_some_and(|id| active.contains(&id)) {
            *counts.entry(visitor.device).or_default() += 1;
            total += 1;
        }
    }

    DeviceType::all()
        .into_iter()
        .filter_map(|device| {
            let share = percentage(counts.get(&device).copied().unwrap_or(0), total);
            let significant = match device {
                DeviceType::Unknown => share > UNKNOWN_DEVICE_FLOOR_PCT,
                _ => share > 0.0,
            };
            significant.then(|| DeviceShare {
                device: device.to_string(),
                percentage: share,
            })
        })
        .collect()
}
