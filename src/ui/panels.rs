use cinefilter::{Dimension, FieldValue};
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color::KeyColors;
use crate::state::DashboardState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// A requested filter change, applied after the widgets are drawn.
enum FilterAction {
    Toggle(Dimension, FieldValue),
    Clear(Dimension),
}

/// Render the left filter panel.
///
/// Each dimension lists the keys of its own aggregate, which ignores the
/// dimension's own filter, so every option stays visible while selected.
pub fn side_panel(ui: &mut Ui, state: &mut DashboardState) {
    ui.heading("Filters");
    ui.separator();

    if state.total == 0 {
        ui.label("No dataset loaded.");
        return;
    }

    let mut actions = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for dimension in Dimension::ALL {
                let agg = state.aggregate(dimension);
                let selected = state.filters.get(dimension);
                let colors = KeyColors::new(agg.keys());

                let mut buckets: Vec<_> = agg.buckets.iter().collect();
                buckets.sort_by(|a, b| a.key.cmp(&b.key));

                let header_text = if selected.is_active() {
                    format!("{dimension}  ({}/{})", selected.len(), buckets.len())
                } else {
                    format!("{dimension}  (all {})", buckets.len())
                };

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dimension)
                    .default_open(dimension != Dimension::Score)
                    .show(ui, |ui: &mut Ui| {
                        if selected.is_active() && ui.small_button("Clear").clicked() {
                            actions.push(FilterAction::Clear(dimension));
                        }

                        for bucket in &buckets {
                            let text = RichText::new(format!("{}  ({})", bucket.key, bucket.count))
                                .color(colors.color_for(&bucket.key));
                            let mut checked = selected.contains(&bucket.key);
                            if ui.checkbox(&mut checked, text).changed() {
                                actions.push(FilterAction::Toggle(dimension, bucket.key.clone()));
                            }
                        }

                        // Selected keys the other filters currently hide.
                        for key in selected.iter().filter(|k| agg.count_for(k) == 0) {
                            let mut checked = true;
                            let text = RichText::new(format!("{key}  (0)")).weak();
                            if ui.checkbox(&mut checked, text).changed() {
                                actions.push(FilterAction::Toggle(dimension, key.clone()));
                            }
                        }
                    });
            }
        });

    for action in actions {
        match action {
            FilterAction::Toggle(dimension, value) => state.toggle_filter_value(dimension, &value),
            FilterAction::Clear(dimension) => state.clear_filter(dimension),
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut DashboardState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if state.total > 0 {
            ui.label(format!(
                "{} movies loaded, {} match all filters",
                state.total, state.matching
            ));

            ui.separator();

            let any_filter = !state.filters.is_empty();
            if ui
                .add_enabled(any_filter, egui::Button::new("Clear filters"))
                .clicked()
            {
                state.clear_all_filters();
            }
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut DashboardState) {
    let file = rfd::FileDialog::new()
        .set_title("Open movie data")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}
