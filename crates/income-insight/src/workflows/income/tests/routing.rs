use super::common::*;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use chrono::Local;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::workflows::income::assembler::ReportAssembler;
use crate::workflows::income::calendar::WeekdayCalendar;
use crate::workflows::income::correlation::RequestCorrelator;
use crate::workflows::income::domain::{IncomeFact, SubjectId};
use crate::workflows::income::events::ComputeOutcome;
use crate::workflows::income::report::ReportViewKind;
use crate::workflows::income::router::{income_router, report_handler, ReportRequest};

/// Facts on both ends of the window that applies to today's benchmark date.
fn facts_for_today() -> Vec<IncomeFact> {
    let (assembler, _, _) = answering_assembler(ComputeOutcome::Completed { facts: Vec::new() });
    let window = assembler
        .accrual_window(Local::now().date_naive())
        .expect("window computes");
    vec![
        fact(window.first_month, "910000001", 1_000),
        fact(window.last_closed_month, "910000001", 2_000),
        fact(window.last_closed_month.succ(), "910000001", 50_000),
    ]
}

fn report_request(body: Value) -> Request<axum::body::Body> {
    Request::post("/api/v1/income/report")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&body).expect("json body"),
        ))
        .expect("request builds")
}

#[tokio::test]
async fn report_route_returns_current_view() {
    let (assembler, _, _) = answering_assembler(ComputeOutcome::Completed {
        facts: facts_for_today(),
    });
    let router = income_router(Arc::new(assembler));
    let today = Local::now().date_naive();

    let response = router
        .oneshot(report_request(json!({
            "subject_id": "1000012345678",
            "benchmark_date": today.to_string(),
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["subject_id"], "1000012345678");
    assert_eq!(payload["total_income_36"], "3000");
    assert!(payload["accrual_period"]["first_month"].is_string());
    let employer = &payload["employer_summaries"][0];
    assert_eq!(employer["org_id"], "910000001");
    assert_eq!(
        employer["employment_periods"].as_array().map(Vec::len),
        Some(2)
    );
    assert_eq!(
        payload["months_income_information"].as_array().map(Vec::len),
        Some(2)
    );
}

#[tokio::test]
async fn report_route_can_render_legacy_view() {
    let (assembler, _, _) = answering_assembler(ComputeOutcome::Completed {
        facts: facts_for_today(),
    });
    let router = income_router(Arc::new(assembler));

    let response = router
        .oneshot(report_request(json!({
            "subject_id": "1000012345678",
            "benchmark_date": Local::now().date_naive().to_string(),
            "view": "legacy",
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_income"], "3000");
    assert!(payload.get("total_income_12").is_none());
    assert!(payload["employer_summaries"][0]
        .get("employment_periods")
        .is_none());
}

#[tokio::test]
async fn report_route_requires_benchmark_date() {
    let (assembler, publisher, _) =
        answering_assembler(ComputeOutcome::Completed { facts: Vec::new() });
    let publisher_log = publisher.clone();
    let router = income_router(Arc::new(assembler));

    let response = router
        .oneshot(report_request(json!({ "subject_id": "1000012345678" })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("benchmark_date"));
    assert!(publisher_log.published().is_empty());
}

#[tokio::test]
async fn report_handler_rejects_future_benchmark() {
    let (assembler, _, _) = answering_assembler(ComputeOutcome::Completed { facts: Vec::new() });
    let tomorrow = Local::now().date_naive().succ_opt().expect("valid date");

    let response = report_handler(
        State(Arc::new(assembler)),
        axum::Json(ReportRequest {
            subject_id: SubjectId("1000012345678".to_string()),
            benchmark_date: Some(tomorrow),
            view: ReportViewKind::Current,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_handler_maps_upstream_failure_to_bad_gateway() {
    let (assembler, _, _) = answering_assembler(ComputeOutcome::Failed {
        reason: "workflow crashed".to_string(),
    });

    let response = report_handler(
        State(Arc::new(assembler)),
        axum::Json(ReportRequest {
            subject_id: SubjectId("1000012345678".to_string()),
            benchmark_date: Some(Local::now().date_naive()),
            view: ReportViewKind::Current,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["retryable"], false);
}

#[tokio::test]
async fn report_handler_maps_timeout_to_gateway_timeout() {
    let assembler = ReportAssembler::new(
        Arc::new(RequestCorrelator::new()),
        Arc::new(SilentPublisher),
        Arc::new(WeekdayCalendar),
        settings(Duration::from_millis(20)),
    );

    let response = report_handler(
        State(Arc::new(assembler)),
        axum::Json(ReportRequest {
            subject_id: SubjectId("1000012345678".to_string()),
            benchmark_date: Some(Local::now().date_naive()),
            view: ReportViewKind::Current,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["retryable"], true);
}

#[tokio::test]
async fn accrual_period_route_returns_window() {
    let (assembler, publisher, _) =
        answering_assembler(ComputeOutcome::Completed { facts: Vec::new() });
    let publisher_log = publisher.clone();
    let router = income_router(Arc::new(assembler));

    let response = router
        .oneshot(
            Request::get("/api/v1/income/accrual-period?benchmark_date=2021-03-03")
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["first_month"], "2018-01");
    assert_eq!(payload["last_closed_month"], "2021-01");
    assert!(
        publisher_log.published().is_empty(),
        "no bus round trip for the window"
    );
}
