use actix_web::{HttpResponse, web};

use crate::analytics::report::generate_report;
use crate::error::AnalyticsError;
use crate::state::app_state::AppState;
use crate::structs::report::ReportQuery;
use crate::utils::time::now_millis;

/// Overview, daily series, popular pages, traffic sources and device mix
/// for the last `period` days.
pub async fn get_analytics_report(
    app_state: web::Data<AppState>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, AnalyticsError> {
    let settings = &app_state.reports;
    let period = query.period.unwrap_or(settings.default_period_days);
    if period == 0 || period > settings.max_period_days {
        return Err(AnalyticsError::Validation(format!(
            "period must be between 1 and {} days",
            settings.max_period_days
        )));
    }

    let report = generate_report(
        app_state.store.as_ref(),
        now_millis(),
        period,
        settings.popular_pages_limit,
    )
    .await?;

    Ok(HttpResponse::Ok().json(report))
}
