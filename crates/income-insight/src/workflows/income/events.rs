//! Compute-request and compute-result messages exchanged with the income
//! computation workflow, plus the in-process channel bus used for local runs.

use super::correlation::{RequestCorrelator, RequestId, ResolveStatus};
use super::domain::{IncomeFact, SubjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Request asking the compute workflow for a subject's income facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub request_id: RequestId,
    pub subject_id: SubjectId,
    pub benchmark_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComputeOutcome {
    Completed { facts: Vec<IncomeFact> },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResult {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub outcome: ComputeOutcome,
}

pub fn encode_request(request: &ComputeRequest) -> Result<String, serde_json::Error> {
    serde_json::to_string(request)
}

pub fn decode_request(payload: &str) -> Result<ComputeRequest, serde_json::Error> {
    serde_json::from_str(payload)
}

pub fn encode_result(result: &ComputeResult) -> Result<String, serde_json::Error> {
    serde_json::to_string(result)
}

pub fn decode_result(payload: &str) -> Result<ComputeResult, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Outbound side of the event bus.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, request: &ComputeRequest) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("compute request could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("event bus is closed")]
    Closed,
    #[error("event bus unavailable: {0}")]
    Transport(String),
}

/// Publishes JSON-encoded requests onto an in-process channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelPublisher {
    pub fn new(sender: mpsc::UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, request: &ComputeRequest) -> Result<(), PublishError> {
        let payload = encode_request(request)?;
        self.sender
            .send(payload)
            .map_err(|_| PublishError::Closed)?;
        debug!(request_id = %request.request_id, "published compute request");
        Ok(())
    }
}

/// Creates a publisher and the receiving end of the request topic.
pub fn channel_bus() -> (ChannelPublisher, mpsc::UnboundedReceiver<String>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelPublisher::new(sender), receiver)
}

/// Consumes compute results and hands them to the correlator.
#[derive(Debug, Clone)]
pub struct ResultListener {
    correlator: Arc<RequestCorrelator>,
}

impl ResultListener {
    pub fn new(correlator: Arc<RequestCorrelator>) -> Self {
        Self { correlator }
    }

    pub fn deliver(&self, result: ComputeResult) -> ResolveStatus {
        let ComputeResult {
            request_id,
            outcome,
        } = result;
        self.correlator.resolve(request_id, outcome)
    }

    pub fn deliver_json(&self, payload: &str) -> Result<ResolveStatus, serde_json::Error> {
        decode_result(payload).map(|result| self.deliver(result))
    }

    /// Drains the result topic until every sender is dropped. Malformed
    /// payloads are logged and skipped.
    pub async fn run(self, mut results: mpsc::UnboundedReceiver<String>) {
        while let Some(payload) = results.recv().await {
            if let Err(err) = self.deliver_json(&payload) {
                warn!(error = %err, "dropping malformed compute result");
            }
        }
        info!("compute result stream closed");
    }
}
