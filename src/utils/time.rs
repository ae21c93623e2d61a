use chrono::{DateTime, NaiveDate, Utc};

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// UTC calendar day a millisecond timestamp falls on.
pub fn day_of(millis: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_boundaries_are_utc() {
        let midnight = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();

        assert_eq!(day_of(midnight), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(day_of(midnight - 1), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    }
}
