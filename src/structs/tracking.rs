use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::time::DAY_MS;

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    #[validate(length(min = 1, max = 2048, message = "url must be 1-2048 characters"))]
    pub url: String,
    #[validate(length(max = 2048, message = "referrer is too long"))]
    pub referrer: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1024, message = "userAgent is too long"))]
    pub user_agent: String,
    pub timestamp: Option<DateTime<Utc>>, // Client clock, logged only
    pub consent_given: Option<bool>,
    pub session_id: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub success: bool,
    pub session_id: String,
    #[serde(default)]
    pub is_new_visitor: bool,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TitleUpdateRequest {
    #[validate(length(min = 1, max = 2048, message = "url must be 1-2048 characters"))]
    pub url: String,
    #[validate(length(max = 512, message = "pageTitle is too long"))]
    pub page_title: String,
    pub session_id: Option<String>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DurationUpdateRequest {
    #[validate(length(min = 1, max = 2048, message = "url must be 1-2048 characters"))]
    pub url: String,
    #[validate(range(min = 0, max = DAY_MS, message = "duration must be between 0 and one day in ms"))]
    pub duration: i64,
    pub session_id: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TitleUpdateResponse {
    pub success: bool,
    pub updated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_request_accepts_tracker_payload() {
        let req: CaptureRequest = serde_json::from_value(serde_json::json!({
            "url": "/products",
            "referrer": null,
            "userAgent": "Mozilla/5.0",
            "timestamp": "2024-06-10T06:13:20Z",
            "consentGiven": true
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        assert!(req.session_id.is_none());
        assert_eq!(req.consent_given, Some(true));
    }

    #[test]
    fn negative_duration_fails_validation() {
        let req = DurationUpdateRequest {
            url: "/".into(),
            duration: -1,
            session_id: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_url_fails_validation() {
        let req = TitleUpdateRequest {
            url: String::new(),
            page_title: "Home".into(),
            session_id: None,
        };
        assert!(req.validate().is_err());
    }
}
