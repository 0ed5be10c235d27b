use chrono::{DateTime, FixedOffset, NaiveDateTime};

use super::frequency::Frequency;
use crate::error::{Result, TimeseriesError};

/// Start date and length a series must share with the first series of the
/// same grouping pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridAnchor {
    pub start: NaiveDateTime,
    pub periods: usize,
}

/// Drop the offset of timezone-aware timestamps, keeping local wall-clock
/// time, so that naive and aware inputs compare equal.
pub fn normalize_timestamps(values: &[DateTime<FixedOffset>]) -> Vec<NaiveDateTime> {
    values.iter().map(|v| v.naive_local()).collect()
}

/// Check that `timestamps` is exactly the regular grid generated from its
/// first value at `frequency`, and optionally that it matches `anchor`.
///
/// For month, quarter and year frequencies every timestamp must also fall on
/// the period end, which is reported with its own message.
pub fn validate_time_grid(
    timestamps: &[NaiveDateTime],
    frequency: &Frequency,
    column: &str,
    anchor: Option<&GridAnchor>,
) -> Result<()> {
    let continuity = |detail: String| TimeseriesError::TimeContinuity {
        column: column.to_string(),
        frequency: frequency.to_string(),
        detail,
        series: None,
    };

    let first = match timestamps.first() {
        Some(first) => *first,
        None => {
            return match anchor {
                Some(a) if a.periods > 0 => Err(continuity(format!(
                    "Expected {} time steps starting at {}, got none.",
                    a.periods, a.start
                ))),
                _ => Ok(()),
            };
        }
    };

    if frequency.is_calendar() && timestamps.iter().any(|ts| !frequency.is_period_end(*ts)) {
        return Err(TimeseriesError::PeriodBoundary {
            column: column.to_string(),
            frequency: frequency.to_string(),
            unit: frequency.unit().name(),
            example: PERIOD_END_EXAMPLE.to_string(),
            series: None,
        });
    }

    // A sequence matching the grid index for index is, by construction, the
    // whole grid between its first and last value.
    for (i, ts) in timestamps.iter().enumerate() {
        let expected = frequency.advance(first, i as i64);
        if expected != Some(*ts) {
            let detail = match expected {
                Some(e) if *ts < e => format!(
                    "Time step {} is {} but {} was expected (duplicated or out of order timestamps).",
                    i, ts, e
                ),
                Some(e) => format!(
                    "Time step {} is {} but {} was expected (missing timestamps).",
                    i, ts, e
                ),
                None => format!("Time step {} is out of the supported calendar.", i),
            };
            return Err(continuity(detail));
        }
    }

    if let Some(anchor) = anchor {
        if first != anchor.start {
            return Err(continuity(format!(
                "All time series must start at the same date: found {} instead of {}.",
                first, anchor.start
            )));
        }
        if timestamps.len() != anchor.periods {
            return Err(continuity(format!(
                "All time series must have the same number of time steps: found {} instead of {}.",
                timestamps.len(),
                anchor.periods
            )));
        }
    }

    Ok(())
}

const PERIOD_END_EXAMPLE: &str = "2020-12-31 00:00:00";
