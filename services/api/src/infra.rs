use chrono::NaiveDate;
use income_insight::config::IncomeConfig;
use income_insight::error::AppError;
use income_insight::workflows::income::events::{decode_request, encode_result};
use income_insight::workflows::income::{
    channel_bus, spawn_sweeper, ChannelPublisher, ComputeOutcome, ComputeResult, IncomeFact,
    ReportAssembler, RequestCorrelator, ResultListener, SubjectId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Income facts per subject served by the local compute workflow.
#[derive(Debug, Default, Clone)]
pub(crate) struct IncomeFixture {
    subjects: HashMap<SubjectId, Vec<IncomeFact>>,
}

impl IncomeFixture {
    pub(crate) fn from_json(raw: &str) -> Result<Self, AppError> {
        let subjects = serde_json::from_str(raw).map_err(AppError::Fixture)?;
        Ok(Self { subjects })
    }

    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub(crate) fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let fixture = Self::from_path(path)?;
                info!(
                    path = %path.display(),
                    subjects = fixture.subjects.len(),
                    "loaded income fixture"
                );
                Ok(fixture)
            }
            None => Ok(Self::default()),
        }
    }

    fn outcome_for(&self, subject_id: &SubjectId) -> ComputeOutcome {
        match self.subjects.get(subject_id) {
            Some(facts) => ComputeOutcome::Completed {
                facts: facts.clone(),
            },
            None => ComputeOutcome::Failed {
                reason: format!("no income registered for subject {subject_id}"),
            },
        }
    }
}

/// Stand-in for the external income computation: answers each request on the
/// request topic with the fixture's facts for that subject.
pub(crate) struct FixtureIncomeWorkflow {
    fixture: IncomeFixture,
    results: mpsc::UnboundedSender<String>,
}

impl FixtureIncomeWorkflow {
    pub(crate) fn new(fixture: IncomeFixture, results: mpsc::UnboundedSender<String>) -> Self {
        Self { fixture, results }
    }

    pub(crate) fn answer(&self, payload: &str) -> Option<String> {
        let request = match decode_request(payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "dropping malformed compute request");
                return None;
            }
        };

        let result = ComputeResult {
            request_id: request.request_id,
            outcome: self.fixture.outcome_for(&request.subject_id),
        };
        match encode_result(&result) {
            Ok(encoded) => Some(encoded),
            Err(err) => {
                warn!(request_id = %request.request_id, error = %err, "failed to encode result");
                None
            }
        }
    }

    pub(crate) async fn run(self, mut requests: mpsc::UnboundedReceiver<String>) {
        while let Some(payload) = requests.recv().await {
            if let Some(result) = self.answer(&payload) {
                if self.results.send(result).is_err() {
                    warn!("result topic closed, stopping compute workflow");
                    break;
                }
            }
        }
    }
}

/// Correlator, bus, and background tasks wired together.
pub(crate) struct IncomePipeline {
    pub(crate) assembler: Arc<ReportAssembler<ChannelPublisher>>,
    pub(crate) correlator: Arc<RequestCorrelator>,
    tasks: Vec<JoinHandle<()>>,
}

impl IncomePipeline {
    pub(crate) fn start(config: &IncomeConfig, fixture: IncomeFixture) -> Self {
        let correlator = Arc::new(RequestCorrelator::new());
        let (publisher, requests) = channel_bus();
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let workflow = FixtureIncomeWorkflow::new(fixture, results_tx);
        let listener = ResultListener::new(correlator.clone());
        let tasks = vec![
            tokio::spawn(workflow.run(requests)),
            tokio::spawn(listener.run(results_rx)),
            spawn_sweeper(
                correlator.clone(),
                config.sweep_interval,
                config.slot_grace_period,
            ),
        ];

        let assembler = Arc::new(ReportAssembler::new(
            correlator.clone(),
            Arc::new(publisher),
            config.calendar.build(),
            config.assembler_settings(),
        ));

        Self {
            assembler,
            correlator,
            tasks,
        }
    }

    pub(crate) fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
        info!(
            pending = self.correlator.pending_len(),
            "income pipeline stopped"
        );
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
