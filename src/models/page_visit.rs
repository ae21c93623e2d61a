use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Bounce value recorded at capture time, before any duration is known.
/// A visit counts as a bounce until a finalize proves engagement.
pub const PROVISIONAL_BOUNCED: bool = true;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PageVisit {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub visitor_id: ObjectId,
    pub url: String,
    pub page_title: Option<String>, // Filled in by the title update
    pub timestamp: i64,             // Capture time in milliseconds, never rewritten
    pub referrer: Option<String>,
    pub duration: Option<i64>, // Milliseconds; None until finalized (possibly forever)
    pub bounced: bool,
}

impl PageVisit {
    pub fn new(visitor_id: ObjectId, url: String, referrer: Option<String>, now: i64) -> Self {
        Self {
            id: None,
            visitor_id,
            url,
            page_title: None,
            timestamp: now,
            referrer: referrer.filter(|r| !r.trim().is_empty()),
            duration: None,
            bounced: PROVISIONAL_BOUNCED,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.duration.is_some()
    }
}

/// A visit is a bounce when the visitor left before the threshold elapsed.
/// Staying exactly `threshold_ms` is engagement.
pub fn is_bounce(duration_ms: i64, threshold_ms: i64) -> bool {
    duration_ms < threshold_ms
}
