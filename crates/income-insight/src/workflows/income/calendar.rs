use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Predicate deciding whether employers are expected to report on a given date.
pub trait WorkingDayCalendar: Send + Sync {
    fn is_working_day(&self, date: NaiveDate) -> bool;
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Monday through Friday, no public holidays.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeekdayCalendar;

impl WorkingDayCalendar for WeekdayCalendar {
    fn is_working_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date)
    }
}

/// Norwegian working days: weekends and the statutory public holidays are closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NorwegianCalendar;

impl NorwegianCalendar {
    pub fn is_public_holiday(date: NaiveDate) -> bool {
        let fixed = matches!(
            (date.month(), date.day()),
            (1, 1) | (5, 1) | (5, 17) | (12, 25) | (12, 26)
        );
        if fixed {
            return true;
        }

        let Some(easter) = easter_sunday(date.year()) else {
            return false;
        };
        let offset = date.signed_duration_since(easter).num_days();
        // Maundy Thursday, Good Friday, Easter Sunday and Monday, Ascension, Whitsun.
        matches!(offset, -3 | -2 | 0 | 1 | 39 | 49 | 50)
    }
}

impl WorkingDayCalendar for NorwegianCalendar {
    fn is_working_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !Self::is_public_holiday(date)
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Calendar selection used by configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarKind {
    #[default]
    Norwegian,
    Weekday,
}

impl CalendarKind {
    pub fn build(self) -> Arc<dyn WorkingDayCalendar> {
        match self {
            Self::Norwegian => Arc::new(NorwegianCalendar),
            Self::Weekday => Arc::new(WeekdayCalendar),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Norwegian => "norwegian",
            Self::Weekday => "weekday",
        }
    }
}

impl fmt::Display for CalendarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CalendarKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "norwegian" | "no" => Ok(Self::Norwegian),
            "weekday" | "weekdays" => Ok(Self::Weekday),
            other => Err(format!("unknown calendar '{other}'")),
        }
    }
}

/// Days from `start` (inclusive) until the next working day, bounded by `limit`.
pub(crate) fn next_working_day(
    calendar: &dyn WorkingDayCalendar,
    start: NaiveDate,
    limit: u64,
) -> Option<NaiveDate> {
    (0..=limit)
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .find(|date| calendar.is_working_day(*date))
}
