use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, http, web};
use anyhow::Context;
use validator::Validate;

use crate::error::{AnalyticsError, PAGE_VISIT_NOT_FOUND, VISITOR_NOT_FOUND};
use crate::middlewares::session_mw::{SESSION_COOKIE, SessionToken, resolve_session};
use crate::models::page_visit::{PageVisit, is_bounce};
use crate::models::visitor::Visitor;
use crate::state::app_state::AppState;
use crate::structs::tracking::{
    CaptureRequest, CaptureResponse, DurationUpdateRequest, SuccessResponse, TitleUpdateRequest,
    TitleUpdateResponse,
};
use crate::utils::hash_ip::hash_ip;
use crate::utils::session_token;
use crate::utils::time::now_millis;

const SESSION_COOKIE_DAYS: i64 = 30;

fn session_cookie(session_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session_id.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(SESSION_COOKIE_DAYS))
        .finish()
}

/// Session token presented with a capture. A malformed token in the body is
/// rejected so the tracker can drop it; a malformed ambient cookie is ignored
/// because the tracker cannot clear it.
fn presented_capture_token(
    body_token: Option<&str>,
    req: &HttpRequest,
) -> Result<Option<String>, AnalyticsError> {
    if let Some(token) = body_token.map(str::trim).filter(|t| !t.is_empty()) {
        if !session_token::is_well_formed(token) {
            return Err(AnalyticsError::InvalidSession);
        }
        return Ok(Some(token.to_string()));
    }

    Ok(req
        .extensions()
        .get::<SessionToken>()
        .map(|t| t.0.clone())
        .filter(|t| session_token::is_well_formed(t)))
}

/// Record a page view, resolving or minting the visitor behind it
pub async fn capture_page_visit(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    web::Json(payload): web::Json<CaptureRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    payload.validate()?;
    if payload.consent_given == Some(false) {
        return Err(AnalyticsError::Validation(
            "Analytics consent not granted".to_string(),
        ));
    }

    let store = app_state.store.as_ref();
    let now = now_millis();

    let existing = match presented_capture_token(payload.session_id.as_deref(), &req)? {
        Some(token) => store.find_visitor_by_session(&token).await?,
        None => None,
    };

    let (visitor_id, session_id, is_new_visitor) = match existing {
        Some(visitor) => {
            let id = visitor.id.context("Stored visitor has no id")?;
            store.touch_visitor(id, now).await?;
            (id, visitor.session_id, false)
        }
        None => {
            // Prefer the UA the page reported; fall back to the request header
            let user_agent = if payload.user_agent.trim().is_empty() {
                req.headers()
                    .get(http::header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            } else {
                payload.user_agent.clone()
            };

            let ip = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            let visitor = Visitor::new(
                session_token::mint(),
                hash_ip(&ip, &app_state.ip_hash_salt),
                user_agent,
                now,
            );
            let visitor = store.insert_visitor(visitor).await?;
            log::debug!(
                "Minted session for new {} visitor",
                visitor.device.to_string().to_lowercase()
            );
            let id = visitor.id.context("Inserted visitor has no id")?;
            (id, visitor.session_id, true)
        }
    };

    let visit = PageVisit::new(visitor_id, payload.url, payload.referrer, now);
    store.insert_page_visit(visit).await?;

    if let Some(client_ts) = payload.timestamp {
        log::debug!(
            "Captured page visit (client clock skew {} ms)",
            now - client_ts.timestamp_millis()
        );
    }

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session_id, app_state.cookie_secure))
        .json(CaptureResponse {
            success: true,
            session_id,
            is_new_visitor,
        }))
}

/// Attach the rendered title to the visitor's latest untitled visit of `url`.
/// Nothing to patch is not an error: the capture may have been slow or lost.
pub async fn update_page_title(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    web::Json(payload): web::Json<TitleUpdateRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    payload.validate()?;
    let token = resolve_session(payload.session_id.as_deref(), &req)
        .ok_or(AnalyticsError::MissingSession)?;

    let title = payload.page_title.trim();
    let store = app_state.store.as_ref();

    let mut updated = false;
    if !title.is_empty() {
        if let Some(visitor) = store.find_visitor_by_session(&token).await? {
            let visitor_id = visitor.id.context("Stored visitor has no id")?;
            if let Some(visit) = store
                .latest_untitled_page_visit(visitor_id, &payload.url)
                .await?
            {
                let visit_id = visit.id.context("Stored page visit has no id")?;
                store.set_page_title(visit_id, title).await?;
                updated = true;
            }
        }
    }

    if !updated {
        log::debug!("No open page visit to title for {}", payload.url);
    }

    Ok(HttpResponse::Ok().json(TitleUpdateResponse {
        success: true,
        updated,
    }))
}

/// Finalize the visitor's latest visit of `url` with its elapsed time.
/// Repeated calls overwrite each other; the last one to arrive wins.
pub async fn update_page_duration(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    web::Json(payload): web::Json<DurationUpdateRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    payload.validate()?;
    let token = resolve_session(payload.session_id.as_deref(), &req)
        .ok_or(AnalyticsError::MissingSession)?;

    let store = app_state.store.as_ref();
    let visitor = store
        .find_visitor_by_session(&token)
        .await?
        .ok_or(AnalyticsError::NotFound(VISITOR_NOT_FOUND))?;
    let visitor_id = visitor.id.context("Stored visitor has no id")?;

    let visit = store
        .latest_page_visit(visitor_id, &payload.url)
        .await?
        .ok_or(AnalyticsError::NotFound(PAGE_VISIT_NOT_FOUND))?;
    let visit_id = visit.id.context("Stored page visit has no id")?;

    let bounced = is_bounce(payload.duration, app_state.tracking.bounce_threshold_ms);
    store
        .finalize_page_visit(visit_id, payload.duration, bounced)
        .await?;

    Ok(HttpResponse::Ok().json(SuccessResponse { success: true }))
}
