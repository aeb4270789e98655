use super::accrual::{AccrualPeriodCalculator, CalendarExhausted};
use super::aggregation::IncomeAggregator;
use super::calendar::WorkingDayCalendar;
use super::correlation::{CorrelationError, RequestCorrelator};
use super::domain::{AccrualWindow, SubjectId};
use super::events::{ComputeOutcome, ComputeRequest, EventPublisher, PublishError};
use super::report::Report;
use chrono::{Local, Months, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Tunables for the report round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerSettings {
    pub response_timeout: Duration,
    pub max_benchmark_age_months: u32,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(10),
            max_benchmark_age_months: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("benchmark date {benchmark_date} is after today ({today})")]
    FutureDated {
        benchmark_date: NaiveDate,
        today: NaiveDate,
    },
    #[error("benchmark date {benchmark_date} must be after {earliest_excluded}")]
    Stale {
        benchmark_date: NaiveDate,
        earliest_excluded: NaiveDate,
    },
}

/// Failures surfaced to callers of [`ReportAssembler::handle`].
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("income computation did not answer within {0:?}")]
    TimedOut(Duration),
    #[error("calendar misconfigured: {0}")]
    CalendarExhausted(#[from] CalendarExhausted),
    #[error("income computation failed: {reason}")]
    UpstreamFailure { reason: String },
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl ReportError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TimedOut(_) | Self::Publish(_))
    }
}

/// Orchestrates the compute round trip and the local period/income calculations.
pub struct ReportAssembler<P> {
    correlator: Arc<RequestCorrelator>,
    publisher: Arc<P>,
    calendar: Arc<dyn WorkingDayCalendar>,
    calculator: AccrualPeriodCalculator,
    settings: AssemblerSettings,
}

impl<P> ReportAssembler<P>
where
    P: EventPublisher + 'static,
{
    pub fn new(
        correlator: Arc<RequestCorrelator>,
        publisher: Arc<P>,
        calendar: Arc<dyn WorkingDayCalendar>,
        settings: AssemblerSettings,
    ) -> Self {
        Self {
            correlator,
            publisher,
            calendar,
            calculator: AccrualPeriodCalculator::default(),
            settings,
        }
    }

    pub fn with_calculator(mut self, calculator: AccrualPeriodCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn settings(&self) -> AssemblerSettings {
        self.settings
    }

    pub fn accrual_window(
        &self,
        benchmark_date: NaiveDate,
    ) -> Result<AccrualWindow, CalendarExhausted> {
        let calendar = self.calendar.as_ref();
        self.calculator.compute(benchmark_date, calendar)
    }

    pub fn validate(
        &self,
        benchmark_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<(), ValidationError> {
        if benchmark_date > today {
            return Err(ValidationError::FutureDated {
                benchmark_date,
                today,
            });
        }

        let bound = Months::new(self.settings.max_benchmark_age_months);
        if let Some(earliest_excluded) = today.checked_sub_months(bound) {
            if benchmark_date <= earliest_excluded {
                return Err(ValidationError::Stale {
                    benchmark_date,
                    earliest_excluded,
                });
            }
        }

        Ok(())
    }

    pub async fn handle(
        &self,
        subject_id: SubjectId,
        benchmark_date: NaiveDate,
    ) -> Result<Report, ReportError> {
        self.handle_on(subject_id, benchmark_date, Local::now().date_naive())
            .await
    }

    /// Same as [`Self::handle`] with an explicit notion of today.
    pub async fn handle_on(
        &self,
        subject_id: SubjectId,
        benchmark_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Report, ReportError> {
        self.validate(benchmark_date, today)?;

        let request_id = self.correlator.register();
        let request = ComputeRequest {
            request_id,
            subject_id: subject_id.clone(),
            benchmark_date,
        };

        if let Err(err) = self.publisher.publish(&request) {
            self.correlator.forget(request_id);
            warn!(%request_id, error = %err, "failed to publish compute request");
            return Err(err.into());
        }
        info!(%request_id, %benchmark_date, "awaiting income computation");

        let timeout = self.settings.response_timeout;
        let outcome = self
            .correlator
            .wait(request_id, timeout)
            .await
            .map_err(|err| match err {
                CorrelationError::TimedOut { timeout, .. } => ReportError::TimedOut(timeout),
                CorrelationError::UnknownRequest(_) => {
                    warn!(%request_id, "pending slot vanished before the result was awaited");
                    ReportError::TimedOut(timeout)
                }
            })?;

        let facts = match outcome.as_ref() {
            ComputeOutcome::Completed { facts } => facts,
            ComputeOutcome::Failed { reason } => {
                warn!(%request_id, %reason, "income computation reported failure");
                return Err(ReportError::UpstreamFailure {
                    reason: reason.clone(),
                });
            }
        };

        let window = self.accrual_window(benchmark_date)?;
        let aggregation = IncomeAggregator::aggregate(facts, &window);
        info!(
            %request_id,
            first_month = %window.first_month,
            last_closed_month = %window.last_closed_month,
            employers = aggregation.employer_summaries.len(),
            "assembled income report"
        );

        Ok(Report::assemble(subject_id, window, aggregation))
    }
}
