use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::assembler::{ReportAssembler, ReportError};
use super::domain::{SubjectId, YearMonth};
use super::events::EventPublisher;
use super::report::ReportViewKind;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportRequest {
    pub subject_id: SubjectId,
    #[serde(default)]
    pub benchmark_date: Option<NaiveDate>,
    #[serde(default)]
    pub view: ReportViewKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccrualQuery {
    #[serde(default)]
    pub benchmark_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccrualPeriodResponse {
    pub benchmark_date: NaiveDate,
    pub first_month: YearMonth,
    pub last_closed_month: YearMonth,
}

/// Router exposing the income report and accrual period endpoints.
pub fn income_router<P>(assembler: Arc<ReportAssembler<P>>) -> Router
where
    P: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/income/report", post(report_handler::<P>))
        .route(
            "/api/v1/income/accrual-period",
            get(accrual_period_handler::<P>),
        )
        .with_state(assembler)
}

fn missing_benchmark_date() -> Response {
    let payload = json!({ "error": "benchmark_date is required (YYYY-MM-DD)" });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

pub fn error_status(error: &ReportError) -> StatusCode {
    match error {
        ReportError::Validation(_) => StatusCode::BAD_REQUEST,
        ReportError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
        ReportError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
        ReportError::Publish(_) => StatusCode::SERVICE_UNAVAILABLE,
        ReportError::CalendarExhausted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) async fn report_handler<P>(
    State(assembler): State<Arc<ReportAssembler<P>>>,
    axum::Json(request): axum::Json<ReportRequest>,
) -> Response
where
    P: EventPublisher + 'static,
{
    let ReportRequest {
        subject_id,
        benchmark_date,
        view,
    } = request;
    let Some(benchmark_date) = benchmark_date else {
        return missing_benchmark_date();
    };

    match assembler.handle(subject_id, benchmark_date).await {
        Ok(report) => match view {
            ReportViewKind::Current => {
                (StatusCode::OK, axum::Json(report.to_view())).into_response()
            }
            ReportViewKind::Legacy => {
                (StatusCode::OK, axum::Json(report.to_legacy_view())).into_response()
            }
        },
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
                "retryable": error.is_retryable(),
            });
            (error_status(&error), axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn accrual_period_handler<P>(
    State(assembler): State<Arc<ReportAssembler<P>>>,
    Query(query): Query<AccrualQuery>,
) -> Response
where
    P: EventPublisher + 'static,
{
    let Some(benchmark_date) = query.benchmark_date else {
        return missing_benchmark_date();
    };

    match assembler.accrual_window(benchmark_date) {
        Ok(window) => {
            let payload = AccrualPeriodResponse {
                benchmark_date,
                first_month: window.first_month,
                last_closed_month: window.last_closed_month,
            };
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let error = ReportError::from(error);
            let payload = json!({ "error": error.to_string() });
            (error_status(&error), axum::Json(payload)).into_response()
        }
    }
}
