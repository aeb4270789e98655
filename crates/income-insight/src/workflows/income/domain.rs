use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of the person the income report is produced for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Organisation number of an employer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployerId(pub String);

impl fmt::Display for EmployerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A calendar month, ordered chronologically and serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }

    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn plus_months(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    pub fn minus_months(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() - months)
    }

    pub fn succ(self) -> Self {
        self.plus_months(1)
    }

    /// Signed number of months from `self` to `later`.
    pub fn months_until(self, later: YearMonth) -> i64 {
        later.ordinal() - self.ordinal()
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid YYYY-MM month")]
pub struct YearMonthParseError {
    pub value: String,
}

impl FromStr for YearMonth {
    type Err = YearMonthParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || YearMonthParseError {
            value: raw.to_string(),
        };
        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One employer-attributed income amount for a single month, as delivered by
/// the compute workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeFact {
    pub month: YearMonth,
    pub employer_id: EmployerId,
    pub employer_name: String,
    pub amount: Decimal,
    pub category: String,
}

/// Inclusive range of closed reporting months used for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualWindow {
    pub first_month: YearMonth,
    pub last_closed_month: YearMonth,
}

impl AccrualWindow {
    pub const LOOKBACK_MONTHS: i64 = 36;

    /// Window ending at `last_closed_month` and reaching back the full look-back span.
    pub fn ending_at(last_closed_month: YearMonth) -> Self {
        Self {
            first_month: last_closed_month.minus_months(Self::LOOKBACK_MONTHS),
            last_closed_month,
        }
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.first_month <= month && month <= self.last_closed_month
    }

    /// First month of the trailing `months`-long span ending at the last closed month.
    pub fn recent_start(&self, months: i64) -> YearMonth {
        let start = self.last_closed_month.minus_months(months - 1);
        start.max(self.first_month)
    }
}

/// Inclusive run of consecutive months in which an employer reported income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentPeriod {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl EmploymentPeriod {
    pub const fn single(month: YearMonth) -> Self {
        Self {
            start: month,
            end: month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployerSummary {
    pub employer_id: EmployerId,
    pub employer_name: String,
    pub total_income: Decimal,
    pub periods: Vec<EmploymentPeriod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomeLine {
    pub amount: Decimal,
    pub category: String,
}

/// Income reported by one employer within a single month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployerMonthIncome {
    pub employer_id: EmployerId,
    pub employer_name: String,
    pub total: Decimal,
    pub incomes: Vec<IncomeLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyIncomeInformation {
    pub month: YearMonth,
    pub employers: Vec<EmployerMonthIncome>,
    pub month_total: Decimal,
}
