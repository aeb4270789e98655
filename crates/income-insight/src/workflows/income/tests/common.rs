use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::workflows::income::assembler::{AssemblerSettings, ReportAssembler};
use crate::workflows::income::calendar::WeekdayCalendar;
use crate::workflows::income::correlation::RequestCorrelator;
use crate::workflows::income::domain::{EmployerId, IncomeFact, YearMonth};
use crate::workflows::income::events::{
    ComputeOutcome, ComputeRequest, EventPublisher, PublishError,
};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn ym(year: i32, month: u32) -> YearMonth {
    YearMonth::new(year, month).expect("valid month")
}

pub(super) fn fact(month: YearMonth, employer: &str, amount: i64) -> IncomeFact {
    IncomeFact {
        month,
        employer_id: EmployerId(employer.to_string()),
        employer_name: format!("Employer {employer}"),
        amount: Decimal::new(amount, 0),
        category: "fastloenn".to_string(),
    }
}

/// Facts for a benchmark of 2021-03-03 (window 2018-01 ..= 2021-01).
pub(super) fn sample_facts() -> Vec<IncomeFact> {
    vec![
        fact(ym(2017, 12), "910000001", 999),
        fact(ym(2019, 11), "910000001", 30_000),
        fact(ym(2019, 12), "910000001", 30_000),
        fact(ym(2020, 2), "910000001", 31_000),
        fact(ym(2020, 2), "920000002", 5_000),
        fact(ym(2021, 1), "920000002", 6_000),
    ]
}

pub(super) fn settings(timeout: Duration) -> AssemblerSettings {
    AssemblerSettings {
        response_timeout: timeout,
        max_benchmark_age_months: 2,
    }
}

/// Answers every published request right away with a fixed outcome.
pub(super) struct AnsweringPublisher {
    pub(super) correlator: Arc<RequestCorrelator>,
    pub(super) outcome: ComputeOutcome,
    pub(super) published: Mutex<Vec<ComputeRequest>>,
}

impl AnsweringPublisher {
    pub(super) fn new(correlator: Arc<RequestCorrelator>, outcome: ComputeOutcome) -> Self {
        Self {
            correlator,
            outcome,
            published: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn published(&self) -> Vec<ComputeRequest> {
        self.published.lock().expect("publish log poisoned").clone()
    }
}

impl EventPublisher for AnsweringPublisher {
    fn publish(&self, request: &ComputeRequest) -> Result<(), PublishError> {
        self.published
            .lock()
            .expect("publish log poisoned")
            .push(request.clone());
        let outcome = self.outcome.clone();
        self.correlator.resolve(request.request_id, outcome);
        Ok(())
    }
}

/// Accepts requests but never answers them.
#[derive(Default)]
pub(super) struct SilentPublisher;

impl EventPublisher for SilentPublisher {
    fn publish(&self, _request: &ComputeRequest) -> Result<(), PublishError> {
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct UnavailablePublisher;

impl EventPublisher for UnavailablePublisher {
    fn publish(&self, _request: &ComputeRequest) -> Result<(), PublishError> {
        Err(PublishError::Transport("broker offline".to_string()))
    }
}

pub(super) fn answering_assembler(
    outcome: ComputeOutcome,
) -> (
    ReportAssembler<AnsweringPublisher>,
    Arc<AnsweringPublisher>,
    Arc<RequestCorrelator>,
) {
    let correlator = Arc::new(RequestCorrelator::new());
    let publisher = Arc::new(AnsweringPublisher::new(correlator.clone(), outcome));
    let assembler = ReportAssembler::new(
        correlator.clone(),
        publisher.clone(),
        Arc::new(WeekdayCalendar),
        settings(Duration::from_secs(5)),
    );
    (assembler, publisher, correlator)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&body).expect("body is json")
}
