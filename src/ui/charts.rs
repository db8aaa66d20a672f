use cinefilter::{Bucket, Dimension, FieldValue};
use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Plot};

use crate::color::KeyColors;
use crate::state::DashboardState;

// ---------------------------------------------------------------------------
// Aggregate charts (central panel)
// ---------------------------------------------------------------------------

/// Render one bar chart per dimension. Clicking a bar toggles its key in
/// that dimension's filter.
pub fn dashboard_charts(ui: &mut Ui, state: &mut DashboardState) {
    if state.total == 0 {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view movies  (File → Open…)");
        });
        return;
    }

    let chart_height = ((ui.available_height() - 90.0) / 3.0).max(120.0);
    let mut clicked = None;

    for dimension in Dimension::ALL {
        ui.strong(dimension.label());
        if let Some(key) = bar_chart(ui, state, dimension, chart_height) {
            clicked = Some((dimension, key));
        }
        if dimension == Dimension::Score {
            score_summary(ui, state);
        }
    }

    if let Some((dimension, key)) = clicked {
        state.toggle_filter_value(dimension, &key);
    }
}

/// Draw the chart for `dimension`; returns the key of a clicked bar.
fn bar_chart(
    ui: &mut Ui,
    state: &DashboardState,
    dimension: Dimension,
    height: f32,
) -> Option<FieldValue> {
    let agg = state.aggregate(dimension);
    let selection = state.filters.get(dimension);
    let colors = KeyColors::new(agg.keys());

    let mut buckets: Vec<&Bucket> = agg.buckets.iter().collect();
    buckets.sort_by(|a, b| a.key.cmp(&b.key));

    // Years and scores sit on a numeric axis; ratings are categorical.
    let positions: Vec<f64> = buckets
        .iter()
        .enumerate()
        .map(|(i, b)| match dimension {
            Dimension::Age => i as f64,
            Dimension::Year | Dimension::Score => b.key.as_f64().unwrap_or(i as f64),
        })
        .collect();
    let bar_width = match dimension {
        Dimension::Score => 0.08,
        Dimension::Year | Dimension::Age => 0.8,
    };

    let bars: Vec<Bar> = buckets
        .iter()
        .zip(&positions)
        .map(|(bucket, &x)| {
            let mut fill = colors.color_for(&bucket.key);
            if selection.is_active() && !selection.contains(&bucket.key) {
                fill = fill.gamma_multiply(0.3);
            }
            Bar::new(x, bucket.count as f64)
                .name(bucket.key.to_string())
                .fill(fill)
                .width(bar_width)
        })
        .collect();

    let chart = BarChart::new(bars).name(dimension.label());

    let clicked_at = Plot::new(("aggregate_chart", dimension))
        .height(height)
        .y_axis_label("Movies")
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
            if plot_ui.response().clicked() {
                plot_ui.pointer_coordinate()
            } else {
                None
            }
        })
        .inner?;

    positions
        .iter()
        .position(|&x| (clicked_at.x - x).abs() <= bar_width / 2.0)
        .map(|i| buckets[i].key.clone())
}

/// One-line summary of the raw score list behind the score chart.
fn score_summary(ui: &mut Ui, state: &DashboardState) {
    let scores = &state.aggregate(Dimension::Score).raw_scores;
    if scores.is_empty() {
        ui.weak("No scores match the current filters.");
        return;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ui.weak(format!(
        "{} scored movies, mean {mean:.2}, range {min:.1}–{max:.1}",
        scores.len()
    ));
}
