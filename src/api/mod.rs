use chrono::{Days, Months, NaiveDate};

use crate::LinkyError;
use consumption::Granularity;

pub mod consumption;

/// Dates travel as `DD/MM/YYYY` in both directions.
const API_DATE_FORMAT: &str = "%d/%m/%Y";

pub trait FormatToApiFmt {
    fn to_api_format(&self) -> String;
}

impl FormatToApiFmt for NaiveDate {
    fn to_api_format(&self) -> String {
        self.format(API_DATE_FORMAT).to_string()
    }
}

pub(crate) fn parse_api_date(value: &str) -> Result<NaiveDate, LinkyError> {
    NaiveDate::parse_from_str(value, API_DATE_FORMAT).map_err(|e| {
        LinkyError::MalformedResponse(format!("invalid date '{}': {}", value, e))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The window the portal is usually asked for, relative to `today`.
    ///
    /// Yearly data has no window: the portal always answers with its own
    /// trailing years.
    pub fn default_for(granularity: Granularity, today: NaiveDate) -> Option<Self> {
        match granularity {
            Granularity::Year => None,
            Granularity::Month => Some(Self::new(sub_months(today, 6), today)),
            Granularity::Day => {
                let end = today - Days::new(1);
                Some(Self::new(sub_months(today, 1) - Days::new(1), end))
            }
            Granularity::Hour => Some(Self::new(today - Days::new(2), today)),
        }
    }

    fn to_form(&self, prefix: &str) -> Vec<(String, String)> {
        vec![
            (format!("{}_dateDebut", prefix), self.start.to_api_format()),
            (format!("{}_dateFin", prefix), self.end.to_api_format()),
        ]
    }
}

// Clamps to the end of the month, so 31/03 minus one month is 29/02 or 28/02.
fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}
