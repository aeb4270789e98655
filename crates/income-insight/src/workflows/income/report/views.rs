use super::super::domain::YearMonth;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which external representation a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportViewKind {
    #[default]
    Current,
    Legacy,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccrualPeriodView {
    pub first_month: YearMonth,
    pub last_closed_month: YearMonth,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmploymentPeriodView {
    pub start_month: YearMonth,
    pub end_month: YearMonth,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployerSummaryView {
    pub name: String,
    pub org_id: String,
    pub income: Decimal,
    pub employment_periods: Vec<EmploymentPeriodView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncomeView {
    pub income: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployerIncomeView {
    pub name: String,
    pub org_id: String,
    pub incomes: Vec<IncomeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthIncomeView {
    pub month: YearMonth,
    pub employers: Vec<EmployerIncomeView>,
    pub total_income_month: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub subject_id: String,
    pub accrual_period: AccrualPeriodView,
    pub total_income_36: Decimal,
    pub total_income_12: Decimal,
    pub employer_summaries: Vec<EmployerSummaryView>,
    pub months_income_information: Vec<MonthIncomeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegacyEmployerSummaryView {
    pub name: String,
    pub org_id: String,
    pub income: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegacyReportView {
    pub subject_id: String,
    pub total_income: Decimal,
    pub employer_summaries: Vec<LegacyEmployerSummaryView>,
    pub months_income_information: Vec<MonthIncomeView>,
}
