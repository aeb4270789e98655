use super::calendar::{next_working_day, WorkingDayCalendar};
use super::domain::{AccrualWindow, YearMonth};
use chrono::{Datelike, NaiveDate};

/// Day of the month employers must have reported the previous month by.
pub const REPORTING_DEADLINE_DAY: u32 = 5;

/// Default number of days scanned past the reporting deadline for a working day.
pub const DEFAULT_DEADLINE_SCAN_DAYS: u64 = 14;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no working day found within {scanned_days} days after reporting deadline {deadline}")]
pub struct CalendarExhausted {
    pub deadline: NaiveDate,
    pub scanned_days: u64,
}

/// Derives the closed reporting month and look-back window for a benchmark date.
#[derive(Debug, Clone, Copy)]
pub struct AccrualPeriodCalculator {
    max_scan_days: u64,
}

impl Default for AccrualPeriodCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE_SCAN_DAYS)
    }
}

impl AccrualPeriodCalculator {
    pub const fn new(max_scan_days: u64) -> Self {
        Self { max_scan_days }
    }

    /// The reporting deadline of the benchmark month, moved forward to the
    /// first working day on or after the 5th.
    pub fn reporting_deadline(
        &self,
        benchmark_date: NaiveDate,
        calendar: &dyn WorkingDayCalendar,
    ) -> Result<NaiveDate, CalendarExhausted> {
        // Every month has a 5th.
        let deadline = benchmark_date
            .with_day(REPORTING_DEADLINE_DAY)
            .unwrap_or(benchmark_date);

        next_working_day(calendar, deadline, self.max_scan_days).ok_or(CalendarExhausted {
            deadline,
            scanned_days: self.max_scan_days,
        })
    }

    pub fn compute(
        &self,
        benchmark_date: NaiveDate,
        calendar: &dyn WorkingDayCalendar,
    ) -> Result<AccrualWindow, CalendarExhausted> {
        let real_deadline = self.reporting_deadline(benchmark_date, calendar)?;
        let months_to_subtract = if benchmark_date <= real_deadline { 2 } else { 1 };
        let benchmark_month = YearMonth::from_date(benchmark_date);
        let last_closed_month = benchmark_month.minus_months(months_to_subtract);

        Ok(AccrualWindow::ending_at(last_closed_month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::income::calendar::{NorwegianCalendar, WeekdayCalendar};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    struct Closed;

    impl WorkingDayCalendar for Closed {
        fn is_working_day(&self, _date: NaiveDate) -> bool {
            false
        }
    }

    #[test]
    fn benchmark_before_deadline_subtracts_two_months() {
        let window = AccrualPeriodCalculator::default()
            .compute(date(2021, 3, 3), &WeekdayCalendar)
            .expect("window computes");

        assert_eq!(window.last_closed_month, ym(2021, 1));
        assert_eq!(window.first_month, ym(2018, 1));
    }

    #[test]
    fn benchmark_on_deadline_counts_as_before() {
        let window = AccrualPeriodCalculator::default()
            .compute(date(2021, 3, 5), &WeekdayCalendar)
            .expect("window computes");

        assert_eq!(window.last_closed_month, ym(2021, 1));
    }

    #[test]
    fn benchmark_after_deadline_subtracts_one_month() {
        let window = AccrualPeriodCalculator::default()
            .compute(date(2021, 3, 8), &WeekdayCalendar)
            .expect("window computes");

        assert_eq!(window.last_closed_month, ym(2021, 2));
        assert_eq!(window.first_month, ym(2018, 2));
    }

    #[test]
    fn deadline_on_weekend_moves_to_next_working_day() {
        // 2021-06-05 is a Saturday, so the deadline becomes Monday the 7th.
        let calculator = AccrualPeriodCalculator::default();
        let deadline = calculator
            .reporting_deadline(date(2021, 6, 20), &NorwegianCalendar)
            .expect("deadline found");
        assert_eq!(deadline, date(2021, 6, 7));

        let window = calculator
            .compute(date(2021, 6, 7), &NorwegianCalendar)
            .expect("window computes");
        assert_eq!(window.last_closed_month, ym(2021, 4));
    }

    #[test]
    fn january_benchmark_wraps_into_previous_year() {
        let window = AccrualPeriodCalculator::default()
            .compute(date(2020, 1, 2), &NorwegianCalendar)
            .expect("window computes");

        assert_eq!(window.last_closed_month, ym(2019, 11));
        assert_eq!(window.first_month, ym(2016, 11));
    }

    #[test]
    fn exhausted_calendar_fails_instead_of_looping() {
        let error = AccrualPeriodCalculator::default()
            .compute(date(2021, 3, 3), &Closed)
            .expect_err("no working day available");

        assert_eq!(error.deadline, date(2021, 3, 5));
        assert_eq!(error.scanned_days, DEFAULT_DEADLINE_SCAN_DAYS);
    }

    #[test]
    fn compute_is_deterministic() {
        let calculator = AccrualPeriodCalculator::default();
        let first = calculator.compute(date(2022, 10, 4), &NorwegianCalendar);
        let second = calculator.compute(date(2022, 10, 4), &NorwegianCalendar);
        assert_eq!(first, second);
    }
}
