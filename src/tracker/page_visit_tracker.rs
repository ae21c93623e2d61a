use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::structs::tracking::{
    CaptureRequest, CaptureResponse, DurationUpdateRequest, TitleUpdateRequest,
};
use crate::tracker::TrackerConfig;
use crate::tracker::backoff::backoff_delay;
use crate::tracker::clock::Clock;
use crate::tracker::consent::ConsentProvider;
use crate::tracker::page::PageContext;
use crate::tracker::session::SessionManager;
use crate::tracker::transport::{BeaconTransport, TrackerTransport, TransportError};
use crate::utils::time::DAY_MS;

/// Per-navigation tracking state, rebuilt whenever the pathname changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationScope {
    pub pathname: String,
    pub started_at: i64,
    pub captured: bool,
}

impl NavigationScope {
    pub fn new(pathname: String, started_at: i64) -> Self {
        Self {
            pathname,
            started_at,
            captured: false,
        }
    }

    /// Time on page in milliseconds, capped at the server's one-day ceiling.
    pub fn elapsed(&self, now: i64) -> i64 {
        now.saturating_sub(self.started_at).clamp(0, DAY_MS)
    }
}

pub struct PageVisitTracker {
    transport: Arc<dyn TrackerTransport>,
    beacon: Arc<dyn BeaconTransport>,
    consent: Arc<dyn ConsentProvider>,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    scope: Mutex<Option<NavigationScope>>,
}

impl PageVisitTracker {
    pub fn new(
        transport: Arc<dyn TrackerTransport>,
        beacon: Arc<dyn BeaconTransport>,
        consent: Arc<dyn ConsentProvider>,
        sessions: SessionManager,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            transport,
            beacon,
            consent,
            sessions,
            clock,
            config,
            scope: Mutex::new(None),
        }
    }

    fn scope(&self) -> MutexGuard<'_, Option<NavigationScope>> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_scope(&self) -> Option<NavigationScope> {
        self.scope().clone()
    }

    /// Track the page currently shown. Safe to call on every render: capture
    /// happens at most once per pathname, and a pathname change first
    /// finalizes the page being left. Resolves after the title update has
    /// been attempted; hosts usually spawn it.
    pub async fn initialize_tracking(&self, page: &dyn PageContext) {
        if !self.consent.analytics_granted() {
            return;
        }

        let pathname = page.pathname();
        {
            let mut scope = self.scope();
            let is_new_page = scope.as_ref().is_none_or(|s| s.pathname != pathname);
            if is_new_page {
                if let Some(previous) = scope.as_ref() {
                    self.flush_duration(previous);
                }
                *scope = Some(NavigationScope::new(pathname.clone(), self.clock.now_millis()));
            }

            match scope.as_mut() {
                Some(current) if !current.captured => current.captured = true,
                _ => return,
            }
        }

        if self.capture_page_visit(page).await.is_err() {
            return;
        }

        tokio::time::sleep(self.config.title_delay).await;

        // The visitor may have moved on while we waited
        let still_here = self
            .scope()
            .as_ref()
            .is_some_and(|s| s.pathname == pathname);
        if still_here {
            self.update_page_title(page).await;
        }
    }

    /// Send the capture, retrying transient failures with exponential backoff.
    /// A rejected session on the first attempt is dropped and the capture
    /// repeated without one, letting the server mint a fresh token.
    pub async fn capture_page_visit(
        &self,
        page: &dyn PageContext,
    ) -> Result<CaptureResponse, TransportError> {
        let mut token = self.sessions.get();
        let mut attempt: u32 = 0;

        loop {
            let request = CaptureRequest {
                url: page.pathname(),
                referrer: page.referrer(),
                user_agent: page.user_agent(),
                timestamp: DateTime::<Utc>::from_timestamp_millis(self.clock.now_millis()),
                consent_given: Some(true),
                session_id: token.clone(),
            };

            match self.transport.capture(&request).await {
                Ok(response) => {
                    self.sessions.set(&response.session_id);
                    return Ok(response);
                }
                Err(TransportError::InvalidSession) if attempt == 0 && token.is_some() => {
                    log::info!("Stored session rejected, retrying without it");
                    self.sessions.clear();
                    token = None;
                }
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay =
                        backoff_delay(self.config.backoff_base, attempt, self.config.backoff_cap);
                    log::debug!(
                        "Capture attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    log::warn!(
                        "Giving up on page visit capture after {} attempt(s): {}",
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }
            }
            attempt += 1;
        }
    }

    /// One attempt; a lost title is acceptable.
    pub async fn update_page_title(&self, page: &dyn PageContext) {
        let Some(session_id) = self.sessions.get() else {
            return;
        };

        let request = TitleUpdateRequest {
            url: page.pathname(),
            page_title: page.title(),
            session_id: Some(session_id),
        };
        if let Err(e) = self.transport.update_title(&request).await {
            log::warn!("Failed to update page title: {}", e);
        }
    }

    /// Report time spent on the current page through the beacon transport.
    /// Meant for visibility-hidden and unload signals; may fire more than once
    /// per page, in which case the server keeps whichever write lands last.
    pub fn update_page_duration(&self) -> bool {
        if !self.consent.analytics_granted() {
            return false;
        }
        match self.scope().as_ref() {
            Some(scope) => self.flush_duration(scope),
            None => false,
        }
    }

    /// Navigation teardown: finalize the current page and forget it.
    pub fn finish_navigation(&self) -> bool {
        let previous = self.scope().take();
        match previous {
            Some(scope) if self.consent.analytics_granted() => self.flush_duration(&scope),
            _ => false,
        }
    }

    fn flush_duration(&self, scope: &NavigationScope) -> bool {
        if !scope.captured {
            return false;
        }

        let request = DurationUpdateRequest {
            url: scope.pathname.clone(),
            duration: scope.elapsed(self.clock.now_millis()),
            session_id: self.sessions.get(),
        };
        let queued = self.beacon.send_beacon(&request);
        if !queued {
            log::warn!("Duration for {} could not be queued", scope.pathname);
        }
        queued
    }
}
