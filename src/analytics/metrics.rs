use std::collections::HashSet;

use mongodb::bson::oid::ObjectId;

use crate::models::page_visit::PageVisit;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part` as a percentage of `whole`, one decimal; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 * 100.0 / whole as f64)
}

/// Percentage change from `previous` to `current`, one decimal.
/// A zero baseline yields 0 rather than an infinite or undefined change.
pub fn growth(current: f64, previous: f64) -> f64 {
    if previous > 0.0 && current.is_finite() {
        round1((current - previous) / previous * 100.0)
    } else {
        0.0
    }
}

pub fn distinct_visitors<'a, I>(visits: I) -> HashSet<ObjectId>
where
    I: IntoIterator<Item = &'a PageVisit>,
{
    visits.into_iter().map(|v| v.visitor_id).collect()
}

/// Mean of the finalized durations in milliseconds, rounded to whole
/// milliseconds. Visits never finalized are left out, not counted as zero.
pub fn average_duration<'a, I>(visits: I) -> f64
where
    I: IntoIterator<Item = &'a PageVisit>,
{
    let (sum, count) = visits
        .into_iter()
        .filter_map(|v| v.duration)
        .fold((0i128, 0usize), |(sum, count), d| (sum + i128::from(d), count + 1));

    if count == 0 {
        0.0
    } else {
        (sum as f64 / count as f64).round()
    }
}

pub fn bounce_rate(visits: &[PageVisit]) -> f64 {
    let bounced = visits.iter().filter(|v| v.bounced).count();
    percentage(bounced, visits.len())
}

/// Headline numbers for one window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowTotals {
    pub pageviews: usize,
    pub visitors: usize,
    pub avg_duration: f64,
    pub bounce_rate: f64,
}

impl WindowTotals {
    pub fn from_visits(visits: &[PageVisit]) -> Self {
        Self {
            pageviews: visits.len(),
            visitors: distinct_visitors(visits).len(),
            avg_duration: average_duration(visits),
            bounce_rate: bounce_rate(visits),
        }
    }
}
