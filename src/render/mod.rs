//! Bar charts and tables built from consumption series.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::api::consumption::{ConsumptionSeries, Granularity};

pub mod calendar;
pub mod chart;
pub mod frame;

pub use calendar::CalendarStep;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartStyle {
    pub title: &'static str,
    pub step: CalendarStep,
    /// strftime format of the x labels
    pub label_format: &'static str,
    pub unit: &'static str,
    pub file_stem: &'static str,
}

impl ChartStyle {
    pub fn for_granularity(granularity: Granularity) -> Self {
        let step = CalendarStep::for_granularity(granularity);
        match granularity {
            Granularity::Hour => ChartStyle {
                title: "Puissance atteinte par demi-heure",
                step,
                label_format: "%H:%M",
                unit: "kW",
                file_stem: "linky_hours",
            },
            Granularity::Day => ChartStyle {
                title: "Consommation d'électricité par jour",
                step,
                label_format: "%d %b",
                unit: "kWh",
                file_stem: "linky_days",
            },
            Granularity::Month => ChartStyle {
                title: "Consommation d'électricité par mois",
                step,
                label_format: "%b",
                unit: "kWh",
                file_stem: "linky_months",
            },
            Granularity::Year => ChartStyle {
                title: "Consommation d'électricité par année",
                step,
                label_format: "%Y",
                unit: "kWh",
                file_stem: "linky_years",
            },
        }
    }
}

pub fn axis_labels(series: &ConsumptionSeries, style: &ChartStyle) -> anyhow::Result<Vec<String>> {
    let labels = calendar::sample_times(series, style.step)?
        .into_iter()
        .map(|at| at.format(style.label_format).to_string())
        .collect();

    Ok(labels)
}

/// Upper bound of the y axis. The subscribed power, when known, so the
/// reader sees how close the curve gets to it.
pub fn y_axis_max(series: &ConsumptionSeries) -> f64 {
    if series.subscribed_power_limit > 0.0 {
        return series.subscribed_power_limit;
    }

    let highest = series
        .samples
        .iter()
        .map(|s| s.value)
        .fold(0.0_f64, f64::max);
    if highest > 0.0 {
        highest * 1.1
    } else {
        1.0
    }
}

/// Renders `series` as an SVG bar chart in `out_dir` and returns its path.
pub fn write_chart(series: &ConsumptionSeries, out_dir: &Path) -> anyhow::Result<PathBuf> {
    let style = ChartStyle::for_granularity(series.granularity);
    let labels = axis_labels(series, &style)?;
    let path = out_dir.join(format!("{}.svg", style.file_stem));

    chart::draw_bars(&path, &style, &labels, &series.values(), y_axis_max(series))?;

    info!(path = %path.display(), samples = series.samples.len(), "chart written");
    Ok(path)
}
