mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::DashboardApp;
use cinefilter::data::loader;
use cinefilter::CrossFilterStore;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // One store for the whole process, handed to the app below.
    let store = CrossFilterStore::new();

    // Optional dataset path as the first argument.
    let mut status_message = None;
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        match loader::load_file(&path) {
            Ok(records) => store.set_dataset(records),
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 900.0])
            .with_min_inner_size([600.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Cinefilter – Movie Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(store, status_message)))),
    )
}
