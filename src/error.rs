use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid session ID")]
    InvalidSession,

    #[error("No session ID found in cookies")]
    MissingSession,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub const VISITOR_NOT_FOUND: &str = "Visitor not found for the provided session ID";
pub const PAGE_VISIT_NOT_FOUND: &str = "No page visit found for the provided URL and visitor";

/// Machine readable code the tracker keys its token reset on.
pub const INVALID_SESSION_CODE: &str = "INVALID_SESSION";

impl ResponseError for AnalyticsError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalyticsError::Validation(_)
            | AnalyticsError::InvalidSession
            | AnalyticsError::MissingSession => StatusCode::BAD_REQUEST,
            AnalyticsError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalyticsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AnalyticsError::InvalidSession => json!({
                "success": false,
                "error": self.to_string(),
                "code": INVALID_SESSION_CODE,
            }),
            AnalyticsError::Storage(_) => {
                // Internals stay in the log
                log::error!("{}", self);
                json!({ "success": false, "error": "Internal server error" })
            }
            _ => json!({ "success": false, "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<validator::ValidationErrors> for AnalyticsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AnalyticsError::Validation(errors.to_string())
    }
}
