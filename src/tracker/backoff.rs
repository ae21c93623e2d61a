use std::time::Duration;

/// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped.
pub fn backoff_delay(base: Duration, attempt: u32, cap: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(cap).min(cap)
}

/// The whole schedule for `retries` retries.
pub fn schedule(base: Duration, retries: u32, cap: Duration) -> Vec<Duration> {
    (0..retries).map(|a| backoff_delay(base, a, cap)).collect()
}
