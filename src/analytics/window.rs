use chrono::NaiveDate;

use crate::utils::time::{DAY_MS, day_of};

/// Half-open time range `[start, end)` in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: i64,
    pub end: i64,
    pub period_days: u32,
}

impl ReportWindow {
    /// The `period_days` days ending at `now`, with `now` itself included.
    pub fn ending_at(now: i64, period_days: u32) -> Self {
        Self {
            start: now - i64::from(period_days) * DAY_MS,
            end: now + 1,
            period_days,
        }
    }

    /// The equal-length window immediately before this one.
    pub fn previous(&self) -> Self {
        let span = self.end - self.start;
        Self {
            start: self.start - span,
            end: self.start,
            period_days: self.period_days,
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Every UTC calendar day the window touches, oldest first.
    pub fn days(&self) -> Vec<NaiveDate> {
        let first = day_of(self.start);
        let last = day_of(self.end - 1);
        first.iter_days().take_while(|d| *d <= last).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_718_000_000_000;

    #[test]
    fn dense_days_cover_period_plus_one() {
        for period in [1, 7, 30, 90] {
            let window = ReportWindow::ending_at(NOW, period);
            assert_eq!(window.days().len(), period as usize + 1, "period {period}");
        }
    }

    #[test]
    fn previous_window_is_adjacent_and_equal_length() {
        let current = ReportWindow::ending_at(NOW, 7);
        let previous = current.previous();

        assert_eq!(previous.end, current.start);
        assert_eq!(previous.end - previous.start, current.end - current.start);
        assert!(!previous.contains(current.start));
        assert!(current.contains(current.start));
        assert!(current.contains(NOW));
    }
}
