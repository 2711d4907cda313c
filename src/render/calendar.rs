use chrono::{Months, NaiveDateTime, NaiveTime, TimeDelta};

use crate::api::consumption::{ConsumptionSeries, Granularity};

/// Distance between two consecutive samples of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarStep {
    /// Fixed sub-day step, e.g. the 30 minutes of the "hourly" curve
    Intraday(TimeDelta),
    Days,
    Months,
    Years,
}

impl CalendarStep {
    pub fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Hour => CalendarStep::Intraday(TimeDelta::minutes(30)),
            Granularity::Day => CalendarStep::Days,
            Granularity::Month => CalendarStep::Months,
            Granularity::Year => CalendarStep::Years,
        }
    }

    /// Moves `at` by `count` steps, backwards when `count` is negative.
    ///
    /// Month and year steps clamp to the last day of the target month.
    pub fn advance(&self, at: NaiveDateTime, count: i64) -> Option<NaiveDateTime> {
        match self {
            CalendarStep::Intraday(step) => {
                at.checked_add_signed(step.checked_mul(i32::try_from(count).ok()?)?)
            }
            CalendarStep::Days => at.checked_add_signed(TimeDelta::try_days(count)?),
            CalendarStep::Months => shift_months(at, count),
            CalendarStep::Years => shift_months(at, count.checked_mul(12)?),
        }
    }
}

fn shift_months(at: NaiveDateTime, count: i64) -> Option<NaiveDateTime> {
    let months = Months::new(u32::try_from(count.unsigned_abs()).ok()?);
    if count >= 0 {
        at.checked_add_months(months)
    } else {
        at.checked_sub_months(months)
    }
}

/// Timestamp of every sample: the first one sits `offset` steps before the
/// reported period start.
pub fn sample_times(
    series: &ConsumptionSeries,
    step: CalendarStep,
) -> anyhow::Result<Vec<NaiveDateTime>> {
    let period_start = series.period_start.and_time(NaiveTime::default());
    let first = step
        .advance(period_start, -series.offset)
        .ok_or_else(|| anyhow::anyhow!("offset {} is out of range", series.offset))?;

    (0..series.samples.len() as i64)
        .map(|i| {
            step.advance(first, i)
                .ok_or_else(|| anyhow::anyhow!("sample {} is out of range", i))
        })
        .collect()
}
