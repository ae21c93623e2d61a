use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use serde_json::{Value, json};

use storefront_analytics::db::memory::MemoryStore;
use storefront_analytics::routes::init_routes;
use storefront_analytics::state::app_state::AppState;

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new($store.clone())))
                .configure(init_routes),
        )
        .await
    };
}

fn capture_body(url: &str, session_id: Option<&str>) -> Value {
    json!({
        "url": url,
        "referrer": null,
        "userAgent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/124.0",
        "timestamp": "2024-06-10T06:13:20Z",
        "consentGiven": true,
        "sessionId": session_id,
    })
}

#[actix_web::test]
async fn first_capture_mints_session_and_reuse_keeps_one_visitor() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/analytics/capture")
        .set_json(capture_body("/", None))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(set_cookie.starts_with("sessionId="));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["isNewVisitor"], true);
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    assert!(!session_id.is_empty());

    let req = test::TestRequest::post()
        .uri("/api/analytics/capture")
        .set_json(capture_body("/products", Some(session_id.as_str())))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["sessionId"], session_id.as_str());
    assert_eq!(body["isNewVisitor"], false);

    assert_eq!(store.visitor_count().await, 1);
    assert_eq!(store.page_visits().await.len(), 2);
}

#[actix_web::test]
async fn unknown_but_well_formed_session_mints_a_new_one() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let unknown = "0d5c3a0e-4a8e-4f44-9a53-2b7f3f0b9c1d";
    let req = test::TestRequest::post()
        .uri("/api/analytics/capture")
        .set_json(capture_body("/", Some(unknown)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_ne!(body["sessionId"], unknown);
    assert_eq!(body["isNewVisitor"], true);
}

#[actix_web::test]
async fn malformed_session_token_is_rejected_with_code() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/analytics/capture")
        .set_json(capture_body("/", Some("garbage")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_SESSION");
    assert_eq!(store.visitor_count().await, 0);
}

#[actix_web::test]
async fn capture_rejects_malformed_payload_and_missing_consent() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/analytics/capture")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{\"url\":")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);

    let mut payload = capture_body("/", None);
    payload["consentGiven"] = json!(false);
    let req = test::TestRequest::post()
        .uri("/api/analytics/capture")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.page_visits().await.len(), 0);
}

macro_rules! capture {
    ($app:expr, $url:expr, $session:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/analytics/capture")
            .set_json(capture_body($url, $session))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body["sessionId"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn duration_errors_follow_resolution_order() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    // No credential at all
    let req = test::TestRequest::post()
        .uri("/api/analytics/duration")
        .set_json(json!({ "url": "/", "duration": 5000 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No session ID found in cookies");

    // Credential that resolves to nobody
    let req = test::TestRequest::post()
        .uri("/api/analytics/duration")
        .insert_header(("X-Session-Id", "0d5c3a0e-4a8e-4f44-9a53-2b7f3f0b9c1d"))
        .set_json(json!({ "url": "/", "duration": 5000 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Visitor not found for the provided session ID");

    // Known visitor, never visited this url
    let session_id = capture!(app, "/", None);
    let req = test::TestRequest::post()
        .uri("/api/analytics/duration")
        .insert_header(("X-Session-Id", session_id.as_str()))
        .set_json(json!({ "url": "/checkout", "duration": 5000 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "No page visit found for the provided URL and visitor"
    );
}

#[actix_web::test]
async fn negative_duration_is_a_validation_error() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);
    let session_id = capture!(app, "/", None);

    let req = test::TestRequest::post()
        .uri("/api/analytics/duration")
        .insert_header(("X-Session-Id", session_id.as_str()))
        .set_json(json!({ "url": "/", "duration": -5 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.page_visits().await[0].duration.is_none());
}

#[actix_web::test]
async fn oversized_durations_are_rejected_and_report_stays_sane() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);
    let first = capture!(app, "/", None);
    let second = capture!(app, "/a", None);

    for (session_id, url) in [(first.as_str(), "/"), (second.as_str(), "/a")] {
        let req = test::TestRequest::post()
            .uri("/api/analytics/duration")
            .insert_header(("X-Session-Id", session_id))
            .set_json(json!({ "url": url, "duration": i64::MAX }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/analytics/duration")
            .insert_header(("X-Session-Id", session_id))
            .set_json(json!({ "url": url, "duration": 86_400_000 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri("/api/analytics/report?period=7")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = test::read_body_json(resp).await;
    assert_eq!(report["overview"]["avgSessionDuration"], 86_400_000.0);
    assert_eq!(report["overview"]["bounceRate"], 0.0);
}

#[actix_web::test]
async fn bounce_threshold_is_exclusive_at_ten_seconds() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);
    let session_id = capture!(app, "/", None);

    for (duration, bounced) in [(9_999, true), (10_000, false)] {
        let req = test::TestRequest::post()
            .uri("/api/analytics/duration")
            .insert_header(("X-Session-Id", session_id.as_str()))
            .set_json(json!({ "url": "/", "duration": duration }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // Repeated finalizes overwrite: the last one wins
        let visit = &store.page_visits().await[0];
        assert_eq!(visit.duration, Some(duration));
        assert_eq!(visit.bounced, bounced);
    }
}

#[actix_web::test]
async fn duration_beacon_with_cookie_and_plain_text_body() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);
    let session_id = capture!(app, "/", None);

    let req = test::TestRequest::post()
        .uri("/api/analytics/duration")
        .cookie(Cookie::new("sessionId", session_id.clone()))
        .insert_header((header::CONTENT_TYPE, "text/plain;charset=UTF-8"))
        .set_payload(json!({ "url": "/", "duration": 15_000 }).to_string())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let visit = &store.page_visits().await[0];
    assert_eq!(visit.duration, Some(15_000));
    assert!(!visit.bounced);
}

#[actix_web::test]
async fn title_update_patches_latest_open_visit_or_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);
    let session_id = capture!(app, "/products", None);

    let req = test::TestRequest::post()
        .uri("/api/analytics/title")
        .set_json(json!({
            "url": "/products",
            "pageTitle": "All products",
            "sessionId": session_id.as_str(),
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "success": true, "updated": true }));
    assert_eq!(
        store.page_visits().await[0].page_title.as_deref(),
        Some("All products")
    );

    // Already titled, and an unknown session: both silently skipped
    for session in [session_id.as_str(), "0d5c3a0e-4a8e-4f44-9a53-2b7f3f0b9c1d"] {
        let req = test::TestRequest::post()
            .uri("/api/analytics/title")
            .set_json(json!({
                "url": "/products",
                "pageTitle": "Other",
                "sessionId": session,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["updated"], false);
    }
    assert_eq!(
        store.page_visits().await[0].page_title.as_deref(),
        Some("All products")
    );
}

#[actix_web::test]
async fn two_page_session_reports_fifty_percent_bounce() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let session_id = capture!(app, "/", None);
    capture!(app, "/products", Some(session_id.as_str()));

    for (url, duration) in [("/", 3_000), ("/products", 42_000)] {
        let req = test::TestRequest::post()
            .uri("/api/analytics/duration")
            .insert_header(("X-Session-Id", session_id.as_str()))
            .set_json(json!({ "url": url, "duration": duration }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let visits = store.page_visits().await;
    assert_eq!(store.visitor_count().await, 1);
    assert_eq!(visits.len(), 2);
    let home = visits.iter().find(|v| v.url == "/").unwrap();
    let products = visits.iter().find(|v| v.url == "/products").unwrap();
    assert!(home.bounced);
    assert!(!products.bounced);

    let req = test::TestRequest::get()
        .uri("/api/analytics/report?period=7")
        .to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;

    let overview = &report["overview"];
    assert_eq!(overview["totalPageviews"], 2);
    assert_eq!(overview["totalVisitors"], 1);
    assert_eq!(overview["bounceRate"], 50.0);
    assert_eq!(overview["avgSessionDuration"], 22_500.0);
    assert_eq!(overview["pageviewsGrowth"], 0.0);

    let daily = report["dailyData"].as_array().unwrap();
    assert_eq!(daily.len(), 8);
    let daily_total: u64 = daily.iter().map(|d| d["pageviews"].as_u64().unwrap()).sum();
    assert_eq!(daily_total, 2);

    assert_eq!(report["trafficSources"][0]["source"], "Direct");
    assert_eq!(report["trafficSources"][0]["percentage"], 100.0);
    assert_eq!(report["deviceData"][0]["device"], "Desktop");
    assert_eq!(report["popularPages"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn report_defaults_to_thirty_days_and_validates_period() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri("/api/analytics/report")
        .to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["period"], 30);
    assert_eq!(report["dailyData"].as_array().unwrap().len(), 31);
    assert_eq!(report["overview"]["bounceRate"], 0.0);

    for bad in ["period=0", "period=1000", "period=abc"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/analytics/report?{}", bad))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{bad}");
    }
}

#[actix_web::test]
async fn health_check_pings_store() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::get().uri("/api/health/check").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "success": true }));
}
