use chrono::NaiveDateTime;
use polars::prelude::*;
use polars::{frame::DataFrame, series::Series};

use crate::api::consumption::ConsumptionSeries;

use super::calendar::{sample_times, CalendarStep};

impl ConsumptionSeries {
    pub fn as_polars_df(&self, step: CalendarStep) -> Result<DataFrame, anyhow::Error> {
        let timestamps: Vec<NaiveDateTime> = sample_times(self, step)?;
        let mut indexes: Vec<i64> = vec![];
        let mut values: Vec<f64> = vec![];

        for sample in &self.samples {
            indexes.push(sample.index);
            values.push(sample.value);
        }

        let df = DataFrame::new(vec![
            Series::new("timestamp".into(), timestamps),
            Series::new("index".into(), indexes),
            Series::new("value".into(), values),
        ])?;

        Ok(df)
    }
}
