use super::domain::{
    AccrualWindow, EmployerId, EmployerMonthIncome, EmployerSummary, EmploymentPeriod, IncomeFact,
    IncomeLine, MonthlyIncomeInformation, YearMonth,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Number of trailing months covered by the short-term total.
pub const RECENT_MONTHS: i64 = 12;

/// Result of aggregating income facts over an accrual window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomeAggregation {
    pub employer_summaries: Vec<EmployerSummary>,
    pub monthly_breakdown: Vec<MonthlyIncomeInformation>,
    pub total_income_36: Decimal,
    pub total_income_12: Decimal,
}

#[derive(Debug)]
struct EmployerAccumulator<'a> {
    name: &'a str,
    name_month: YearMonth,
    total: Decimal,
    months: BTreeSet<YearMonth>,
}

impl<'a> EmployerAccumulator<'a> {
    fn new(fact: &'a IncomeFact) -> Self {
        Self {
            name: &fact.employer_name,
            name_month: fact.month,
            total: Decimal::ZERO,
            months: BTreeSet::new(),
        }
    }
}

/// Stateless aggregation of income facts into employer and monthly summaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct IncomeAggregator;

impl IncomeAggregator {
    /// Facts outside `window` are ignored. Employers are ordered by id and
    /// months ascending; months without facts never appear.
    pub fn aggregate(facts: &[IncomeFact], window: &AccrualWindow) -> IncomeAggregation {
        let recent_start = window.recent_start(RECENT_MONTHS);
        let mut total_income_36 = Decimal::ZERO;
        let mut total_income_12 = Decimal::ZERO;
        let mut employers: BTreeMap<&EmployerId, EmployerAccumulator<'_>> = BTreeMap::new();
        let mut months: BTreeMap<YearMonth, BTreeMap<&EmployerId, EmployerMonthIncome>> =
            BTreeMap::new();

        for fact in facts.iter().filter(|fact| window.contains(fact.month)) {
            total_income_36 += fact.amount;
            if fact.month >= recent_start {
                total_income_12 += fact.amount;
            }

            let employer = employers
                .entry(&fact.employer_id)
                .or_insert_with(|| EmployerAccumulator::new(fact));
            employer.total += fact.amount;
            employer.months.insert(fact.month);
            // The most recently reported name wins when an employer is renamed.
            if fact.month > employer.name_month {
                employer.name = &fact.employer_name;
                employer.name_month = fact.month;
            }

            let month_entry = months
                .entry(fact.month)
                .or_default()
                .entry(&fact.employer_id)
                .or_insert_with(|| EmployerMonthIncome {
                    employer_id: fact.employer_id.clone(),
                    employer_name: fact.employer_name.clone(),
                    total: Decimal::ZERO,
                    incomes: Vec::new(),
                });
            month_entry.total += fact.amount;
            month_entry.incomes.push(IncomeLine {
                amount: fact.amount,
                category: fact.category.clone(),
            });
        }

        let employer_summaries = employers
            .into_iter()
            .map(|(employer_id, accumulator)| EmployerSummary {
                employer_id: employer_id.clone(),
                employer_name: accumulator.name.to_string(),
                total_income: accumulator.total,
                periods: group_into_contiguous_periods(accumulator.months),
            })
            .collect();

        let monthly_breakdown = months
            .into_iter()
            .map(|(month, per_employer)| {
                let employers: Vec<EmployerMonthIncome> = per_employer.into_values().collect();
                let month_total = employers.iter().map(|employer| employer.total).sum();
                MonthlyIncomeInformation {
                    month,
                    employers,
                    month_total,
                }
            })
            .collect();

        IncomeAggregation {
            employer_summaries,
            monthly_breakdown,
            total_income_36,
            total_income_12,
        }
    }
}

/// Folds months into inclusive runs of consecutive months. Input is sorted and
/// de-duplicated first; an empty input yields no periods.
pub fn group_into_contiguous_periods<I>(months: I) -> Vec<EmploymentPeriod>
where
    I: IntoIterator<Item = YearMonth>,
{
    let ordered: BTreeSet<YearMonth> = months.into_iter().collect();
    let mut periods: Vec<EmploymentPeriod> = Vec::new();

    for month in ordered {
        match periods.last_mut() {
            Some(current) if current.end.succ() == month => current.end = month,
            _ => periods.push(EmploymentPeriod::single(month)),
        }
    }

    periods
}
