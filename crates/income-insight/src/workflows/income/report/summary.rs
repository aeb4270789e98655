use super::super::aggregation::IncomeAggregation;
use super::super::domain::{AccrualWindow, EmployerSummary, MonthlyIncomeInformation, SubjectId};
use super::views::{
    AccrualPeriodView, EmployerIncomeView, EmployerSummaryView, EmploymentPeriodView, IncomeView,
    LegacyEmployerSummaryView, LegacyReportView, MonthIncomeView, ReportView,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Canonical income report assembled for one subject and benchmark date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub subject_id: SubjectId,
    pub window: AccrualWindow,
    pub total_income_36: Decimal,
    pub total_income_12: Decimal,
    pub employer_summaries: Vec<EmployerSummary>,
    pub monthly_breakdown: Vec<MonthlyIncomeInformation>,
}

impl Report {
    pub fn assemble(
        subject_id: SubjectId,
        window: AccrualWindow,
        aggregation: IncomeAggregation,
    ) -> Self {
        let IncomeAggregation {
            employer_summaries,
            monthly_breakdown,
            total_income_36,
            total_income_12,
        } = aggregation;

        Self {
            subject_id,
            window,
            total_income_36,
            total_income_12,
            employer_summaries,
            monthly_breakdown,
        }
    }

    /// Current external form: employment periods and both look-back totals.
    pub fn to_view(&self) -> ReportView {
        ReportView {
            subject_id: self.subject_id.0.clone(),
            accrual_period: AccrualPeriodView {
                first_month: self.window.first_month,
                last_closed_month: self.window.last_closed_month,
            },
            total_income_36: self.total_income_36,
            total_income_12: self.total_income_12,
            employer_summaries: self
                .employer_summaries
                .iter()
                .map(|summary| EmployerSummaryView {
                    name: summary.employer_name.clone(),
                    org_id: summary.employer_id.0.clone(),
                    income: summary.total_income,
                    employment_periods: summary
                        .periods
                        .iter()
                        .map(|period| EmploymentPeriodView {
                            start_month: period.start,
                            end_month: period.end,
                        })
                        .collect(),
                })
                .collect(),
            months_income_information: self.month_views(),
        }
    }

    /// Earlier external form with a single total and no employment periods.
    pub fn to_legacy_view(&self) -> LegacyReportView {
        LegacyReportView {
            subject_id: self.subject_id.0.clone(),
            total_income: self.total_income_36,
            employer_summaries: self
                .employer_summaries
                .iter()
                .map(|summary| LegacyEmployerSummaryView {
                    name: summary.employer_name.clone(),
                    org_id: summary.employer_id.0.clone(),
                    income: summary.total_income,
                })
                .collect(),
            months_income_information: self.month_views(),
        }
    }

    fn month_views(&self) -> Vec<MonthIncomeView> {
        self.monthly_breakdown
            .iter()
            .map(|month| MonthIncomeView {
                month: month.month,
                employers: month
                    .employers
                    .iter()
                    .map(|employer| EmployerIncomeView {
                        name: employer.employer_name.clone(),
                        org_id: employer.employer_id.0.clone(),
                        incomes: employer
                            .incomes
                            .iter()
                            .map(|line| IncomeView {
                                income: line.amount,
                                description: line.category.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
                total_income_month: month.month_total,
            })
            .collect()
    }
}
