use super::common::{success_response, AppPath};
use crate::{errors::ApiError, handlers::AppState, services::reports::MonthlyReport};
use axum::{extract::State, response::Response, routing::get, Router};

#[utoipa::path(
    get,
    path = "/api/v1/reports/monthly/{year}/{month}",
    summary = "Monthly payment report",
    description = "Liters and amount owed per active supplier for one calendar month, priced at each supplier's current rate.",
    params(
        ("year" = i64, Path, description = "Calendar year; years outside the supported calendar give an empty report"),
        ("month" = u32, Path, description = "Month, 1 to 12"),
    ),
    responses(
        (status = 200, description = "Report for the month; empty when nothing was delivered", body = MonthlyReport),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Month outside 1..=12", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn monthly_report(
    State(state): State<AppState>,
    AppPath((year, month)): AppPath<(i64, u32)>,
) -> Result<Response, ApiError> {
    let report = state.services.reports.monthly_report(year, month).await?;
    Ok(success_response(report))
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/reports/monthly/:year/:month", get(monthly_report))
}
