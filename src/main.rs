mod app;
mod color;
mod config;
mod data;
mod error;
mod report;
mod state;
mod ui;

use app::ExamTrendsApp;
use config::DashboardConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match DashboardConfig::load_default() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e:#}");
            log::warn!("Falling back to the built-in configuration");
            DashboardConfig::default()
        }
    };
    log::info!(
        "Reading {} subjects from {}",
        config.subjects.len(),
        config.source.path.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Exam Trends",
        options,
        Box::new(|_cc| Ok(Box::new(ExamTrendsApp::new(config)))),
    )
}
