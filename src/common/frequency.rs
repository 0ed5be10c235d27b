use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TimeseriesError};

/// Calendar unit of a [`Frequency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    /// Fixed 7-day steps.
    Week,
    /// Month end.
    Month,
    /// Quarter end (March, June, September, December).
    Quarter,
    /// Year end.
    Year,
}

impl TimeUnit {
    /// Short code used in serialized frequencies.
    pub fn code(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "min",
            TimeUnit::Hour => "H",
            TimeUnit::Day => "D",
            TimeUnit::Week => "W",
            TimeUnit::Month => "M",
            TimeUnit::Quarter => "Q",
            TimeUnit::Year => "Y",
        }
    }

    /// Parse a unit code. Accepts the aliases `T` (minute) and `A` (year).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "min" | "T" => Some(TimeUnit::Minute),
            "H" | "h" => Some(TimeUnit::Hour),
            "D" => Some(TimeUnit::Day),
            "W" => Some(TimeUnit::Week),
            "M" => Some(TimeUnit::Month),
            "Q" => Some(TimeUnit::Quarter),
            "Y" | "A" => Some(TimeUnit::Year),
            _ => None,
        }
    }

    /// Human readable unit name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "Minute",
            TimeUnit::Hour => "Hour",
            TimeUnit::Day => "Day",
            TimeUnit::Week => "Week",
            TimeUnit::Month => "Month",
            TimeUnit::Quarter => "Quarter",
            TimeUnit::Year => "Year",
        }
    }

    /// Months per step for calendar units, None for fixed-duration units.
    fn months(&self) -> Option<i64> {
        match self {
            TimeUnit::Month => Some(1),
            TimeUnit::Quarter => Some(3),
            TimeUnit::Year => Some(12),
            _ => None,
        }
    }
}

/// Step size plus calendar unit, e.g. `3M` for every third month end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    step: u32,
    unit: TimeUnit,
}

impl Frequency {
    pub fn new(step: u32, unit: TimeUnit) -> Result<Self> {
        if step == 0 {
            return Err(TimeseriesError::Config(
                "Time granularity step must be a positive integer.".to_string(),
            ));
        }
        Ok(Frequency { step, unit })
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// True for month, quarter and year frequencies, whose timestamps must
    /// sit on a period end.
    pub fn is_calendar(&self) -> bool {
        self.unit.months().is_some()
    }

    /// Move `n` steps away from `ts`. Calendar units land on the period end
    /// and keep the time of day of `ts`.
    pub fn advance(&self, ts: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
        let steps = n.checked_mul(self.step as i64)?;
        let delta = match self.unit {
            TimeUnit::Minute => Duration::try_minutes(steps)?,
            TimeUnit::Hour => Duration::try_hours(steps)?,
            TimeUnit::Day => Duration::try_days(steps)?,
            TimeUnit::Week => Duration::try_weeks(steps)?,
            TimeUnit::Month | TimeUnit::Quarter | TimeUnit::Year => {
                let months = steps.checked_mul(self.unit.months()?)?;
                let total = ts.year() as i64 * 12 + ts.month0() as i64 + months;
                let year = i32::try_from(total.div_euclid(12)).ok()?;
                let month = total.rem_euclid(12) as u32 + 1;
                return Some(month_end(year, month)?.and_time(ts.time()));
            }
        };
        ts.checked_add_signed(delta)
    }

    /// Whether `ts` falls on a period end. Always true for fixed-duration
    /// units.
    pub fn is_period_end(&self, ts: NaiveDateTime) -> bool {
        match self.unit {
            TimeUnit::Month => is_month_end(ts.date()),
            TimeUnit::Quarter => is_month_end(ts.date()) && ts.month() % 3 == 0,
            TimeUnit::Year => is_month_end(ts.date()) && ts.month() == 12,
            _ => true,
        }
    }

    /// First period end at or after `ts`. Identity for fixed-duration units.
    pub fn roll_forward(&self, ts: NaiveDateTime) -> Option<NaiveDateTime> {
        let month = match self.unit {
            TimeUnit::Month => ts.month(),
            TimeUnit::Quarter => ts.month().div_ceil(3) * 3,
            TimeUnit::Year => 12,
            _ => return Some(ts),
        };
        Some(month_end(ts.year(), month)?.and_time(ts.time()))
    }

    /// Generate `periods` regular timestamps starting at `start`, rolled
    /// forward to the first period end for calendar units.
    pub fn date_range(&self, start: NaiveDateTime, periods: usize) -> Result<Vec<NaiveDateTime>> {
        let first = self.roll_forward(start).ok_or_else(|| self.overflow(start))?;
        (0..periods as i64)
            .map(|i| self.advance(first, i).ok_or_else(|| self.overflow(first)))
            .collect()
    }

    fn overflow(&self, ts: NaiveDateTime) -> TimeseriesError {
        TimeseriesError::Config(format!(
            "Date range of frequency {} starting at {} is out of the supported calendar",
            self, ts
        ))
    }
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map(|next| next.month() != date.month()).unwrap_or(true)
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.step, self.unit.code())
    }
}

impl FromStr for Frequency {
    type Err = TimeseriesError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, code) = s.split_at(split);
        let unit = TimeUnit::from_code(code).ok_or_else(|| {
            TimeseriesError::Config(format!("Invalid time granularity unit '{}'", code))
        })?;
        let step = if digits.is_empty() {
            1
        } else {
            digits.parse::<u32>().map_err(|_| {
                TimeseriesError::Config(format!("Invalid time granularity step '{}'", digits))
            })?
        };
        Frequency::new(step, unit)
    }
}

impl TryFrom<String> for Frequency {
    type Error = TimeseriesError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let freq: Frequency = "3M".parse().unwrap();
        assert_eq!(freq.step(), 3);
        assert_eq!(freq.unit(), TimeUnit::Month);
        assert_eq!(freq.to_string(), "3M");

        let freq: Frequency = "D".parse().unwrap();
        assert_eq!(freq.to_string(), "1D");

        let freq: Frequency = "15T".parse().unwrap();
        assert_eq!(freq.to_string(), "15min");
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        assert!("3X".parse::<Frequency>().is_err());
        assert!("0D".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_month_end_advance() {
        let freq: Frequency = "1M".parse().unwrap();
        assert_eq!(freq.advance(ts(2020, 1, 31), 1), Some(ts(2020, 2, 29)));
        assert_eq!(freq.advance(ts(2020, 2, 29), 1), Some(ts(2020, 3, 31)));
        assert_eq!(freq.advance(ts(2020, 12, 31), 2), Some(ts(2021, 2, 28)));
        assert_eq!(freq.advance(ts(2021, 2, 28), -2), Some(ts(2020, 12, 31)));
    }

    #[test]
    fn test_quarter_and_year() {
        let quarter: Frequency = "Q".parse().unwrap();
        assert!(quarter.is_period_end(ts(2021, 6, 30)));
        assert!(!quarter.is_period_end(ts(2021, 5, 31)));
        assert_eq!(quarter.roll_forward(ts(2021, 4, 10)), Some(ts(2021, 6, 30)));

        let year: Frequency = "Y".parse().unwrap();
        assert_eq!(year.advance(ts(2019, 12, 31), 1), Some(ts(2020, 12, 31)));
        assert!(!year.is_period_end(ts(2019, 11, 30)));
    }

    #[test]
    fn test_date_range_fixed_units() {
        let freq: Frequency = "6H".parse().unwrap();
        let range = freq.date_range(ts(2021, 1, 1), 5).unwrap();
        assert_eq!(range.len(), 5);
        assert_eq!(range[4], ts(2021, 1, 2));

        let weekly: Frequency = "W".parse().unwrap();
        let range = weekly.date_range(ts(2021, 1, 4), 3).unwrap();
        assert_eq!(range[2], ts(2021, 1, 18));
    }

    #[test]
    fn test_serde_as_string() {
        let freq: Frequency = serde_json::from_str("\"2W\"").unwrap();
        assert_eq!(freq.step(), 2);
        assert_eq!(serde_json::to_string(&freq).unwrap(), "\"2W\"");
    }
}
