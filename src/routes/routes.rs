use actix_web::{HttpRequest, error, web};

use crate::error::AnalyticsError;
use crate::handlers::health_handlers::health_check;
use crate::handlers::report_handlers::get_analytics_report;
use crate::handlers::tracking_handlers::{
    capture_page_visit, update_page_duration, update_page_title,
};
use crate::middlewares::session_mw::SessionCredential;

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AnalyticsError::Validation(format!("Malformed payload: {}", err)).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AnalyticsError::Validation(format!("Malformed query: {}", err)).into()
}

/// Configure the routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // Unload-time beacons are commonly sent as text/plain to skip CORS preflight
    cfg.app_data(
        web::JsonConfig::default()
            .limit(16 * 1024)
            .content_type(|mime| mime.essence_str() == "text/plain")
            .content_type_required(false)
            .error_handler(json_error),
    );
    cfg.app_data(web::QueryConfig::default().error_handler(query_error));

    cfg.route("/api/health/check", web::get().to(health_check));
    cfg.service(
        web::scope("/api/analytics")
            .wrap(SessionCredential)
            .route("/capture", web::post().to(capture_page_visit))
            .route("/title", web::post().to(update_page_title))
            .route("/duration", web::post().to(update_page_duration))
            .route("/report", web::get().to(get_analytics_report)),
    );
}
