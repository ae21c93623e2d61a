//! Client-side page visit tracking.
//!
//! The tracker runs inside a browsing context (a webview host, a kiosk shell,
//! a server-side renderer) and talks to the capture, title and duration
//! endpoints. Everything host-specific sits behind a trait: tab-scoped
//! storage, the consent banner, the current page, the network and the clock.

pub mod backoff;
pub mod clock;
pub mod consent;
pub mod page;
pub mod session;
pub mod transport;

mod page_visit_tracker;

pub use page_visit_tracker::{NavigationScope, PageVisitTracker};

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Retries after the first capture attempt for transient failures.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Wait before reading the title, so client-rendered titles can settle.
    pub title_delay: Duration,
    /// Stored tokens older than this are treated as absent.
    pub session_max_age: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(1000),
            backoff_cap: Duration::from_secs(30),
            title_delay: Duration::from_millis(1000),
            session_max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}
