#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod api;
mod config;
mod debug_log;
pub mod gui;
mod hud;
mod live;

use config::{load_config, Config};
use lazy_static::lazy_static;
use std::sync::{Arc, Mutex};

pub const WINDOW_WIDTH: f32 = 1230.0;
pub const WINDOW_HEIGHT: f32 = 720.0;

pub struct AppState {
    pub config: Config,
}

lazy_static! {
    pub static ref APP: Arc<Mutex<AppState>> = Arc::new(Mutex::new(AppState {
        config: load_config(),
    }));
}

fn main() -> eframe::Result<()> {
    crate::log_info!("========================================");
    crate::log_info!("Machine Console v{} STARTUP", env!("CARGO_PKG_VERSION"));
    crate::log_info!("========================================");

    let viewport_builder = eframe::egui::ViewportBuilder::default()
        .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
        .with_resizable(true);

    let options = eframe::NativeOptions {
        viewport: viewport_builder,
        ..Default::default()
    };

    eframe::run_native(
        "Machine Console",
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            cc.egui_ctx.set_visuals(eframe::egui::Visuals::dark());

            // Store global context for background threads
            *gui::GUI_CONTEXT.lock().unwrap() = Some(cc.egui_ctx.clone());

            Ok(Box::new(gui::ConsoleApp::new()))
        }),
    )
}
