//! Income insight workflow: accrual periods, income aggregation, and the
//! request correlation bridge between HTTP callers and the compute bus.

pub mod accrual;
pub mod aggregation;
pub mod assembler;
pub mod calendar;
pub mod correlation;
pub mod domain;
pub mod events;
pub mod report;
pub mod router;

#[cfg(test)]
mod tests;

pub use accrual::{AccrualPeriodCalculator, CalendarExhausted};
pub use aggregation::{group_into_contiguous_periods, IncomeAggregation, IncomeAggregator};
pub use assembler::{AssemblerSettings, ReportAssembler, ReportError, ValidationError};
pub use calendar::{CalendarKind, NorwegianCalendar, WeekdayCalendar, WorkingDayCalendar};
pub use correlation::{
    spawn_sweeper, CorrelationError, RequestCorrelator, RequestId, ResolveStatus, SlotStatus,
};
pub use domain::{
    AccrualWindow, EmployerId, EmployerMonthIncome, EmployerSummary, EmploymentPeriod, IncomeFact,
    IncomeLine, MonthlyIncomeInformation, SubjectId, YearMonth, YearMonthParseError,
};
pub use events::{
    channel_bus, ChannelPublisher, ComputeOutcome, ComputeRequest, ComputeResult, EventPublisher,
    PublishError, ResultListener,
};
pub use report::Report;
pub use router::income_router;
