use std::path::Path;

use plotters::prelude::*;

use super::ChartStyle;

// 4.8 x 3.6 inches at 167 dpi
pub const WIDTH_PX: u32 = 802;
pub const HEIGHT_PX: u32 = 601;

/// Share of each slot covered by its bar
const BAR_WIDTH: f64 = 0.55;

/// Which x labels stay readable once there are too many of them.
///
/// Up to 20 labels are all shown. Up to 40, every other one is hidden,
/// starting with the first. Beyond that only one in four is kept, plus the
/// last one.
pub fn visible_labels(count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| match count {
            0..=20 => true,
            21..=40 => i % 2 == 1,
            _ => i % 4 == 0 || i == count - 1,
        })
        .collect()
}

pub(super) fn draw_bars(
    path: &Path,
    style: &ChartStyle,
    labels: &[String],
    values: &[f64],
    y_max: f64,
) -> anyhow::Result<()> {
    let root = SVGBackend::new(path, (WIDTH_PX, HEIGHT_PX)).into_drawing_area();
    root.fill(&WHITE)?;

    let slots = values.len().max(1) as u32;
    let slot_px = f64::from(WIDTH_PX - 80) / f64::from(slots);
    let bar_margin = (slot_px * (1.0 - BAR_WIDTH) / 2.0) as u32;
    let visible = visible_labels(labels.len());

    let mut chart = ChartBuilder::on(&root)
        .caption(style.title, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..slots).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len() + 1)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => {
                let i = *i as usize;
                if visible.get(i).copied().unwrap_or(false) {
                    labels[i].clone()
                } else {
                    String::new()
                }
            }
            _ => String::new(),
        })
        .y_desc(style.unit)
        .label_style(("sans-serif", 10))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLACK.filled())
            .margin(bar_margin)
            .data(values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
    )?;

    root.present()?;
    Ok(())
}
