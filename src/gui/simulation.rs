//! Simulation engine: render a tactical still, then extrapolate it into
//! surveillance footage through the long-running video operation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eframe::egui;

use crate::api::simulation::{animate_asset, generate_tactical_image};
use crate::log_info;

use super::{map_api_error, request_repaint, COLOR_ALERT, COLOR_DIM, COLOR_TEXT, COLOR_WARN};

#[derive(Default)]
struct SimState {
    status: String,
    image: Option<Vec<u8>>,
    /// Bumped on every new image so egui's texture cache reloads it.
    image_rev: u64,
    video_path: Option<PathBuf>,
}

pub struct SimulationView {
    prompt: String,
    state: Arc<Mutex<SimState>>,
    busy: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl SimulationView {
    pub fn new() -> Self {
        Self {
            prompt: String::new(),
            state: Arc::new(Mutex::new(SimState::default())),
            busy: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    fn generate(&mut self) {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() || self.busy.load(Ordering::SeqCst) {
            return;
        }
        self.busy.store(true, Ordering::SeqCst);
        self.state.lock().unwrap().status =
            "CONSULTING NANO BANANA PREDICTION ENGINE...".to_string();

        let state = self.state.clone();
        let busy = self.busy.clone();
        std::thread::spawn(move || {
            let result = generate_tactical_image(&prompt);
            let mut state = state.lock().unwrap();
            match result {
                Ok(png) => {
                    state.image = Some(png);
                    state.image_rev += 1;
                    state.video_path = None;
                    state.status = "PREDICTION LOADED.".to_string();
                }
                Err(e) => {
                    state.status = map_api_error(&e, "SYSTEM ERROR: UNABLE TO RENDER ASSET.");
                }
            }
            drop(state);
            busy.store(false, Ordering::SeqCst);
            request_repaint();
        });
    }

    fn animate(&mut self) {
        if self.busy.load(Ordering::SeqCst) {
            return;
        }
        let Some(image) = self.state.lock().unwrap().image.clone() else {
            return;
        };
        let prompt = if self.prompt.trim().is_empty() {
            "Asset simulation".to_string()
        } else {
            self.prompt.trim().to_string()
        };

        self.busy.store(true, Ordering::SeqCst);
        self.cancel.store(false, Ordering::SeqCst);
        self.state.lock().unwrap().status = "EXTRAPOLATING VEO VECTOR DATA...".to_string();

        let state = self.state.clone();
        let busy = self.busy.clone();
        let cancel = self.cancel.clone();
        std::thread::spawn(move || {
            let result = animate_asset(&image, &prompt, &cancel);
            let mut state = state.lock().unwrap();
            match result {
                Ok(mp4) => match write_video_file(&mp4) {
                    Ok(path) => {
                        state.video_path = Some(path);
                        state.status = "VECTOR EXTRAPOLATION COMPLETE.".to_string();
                    }
                    Err(e) => {
                        log_info!("Failed to store simulation video: {}", e);
                        state.status = "ERROR: VIDEO ENGINE UNSTABLE.".to_string();
                    }
                },
                Err(e) if cancel.load(Ordering::SeqCst) => {
                    log_info!("Simulation aborted: {}", e);
                    state.status = "CRITICAL ERROR: SIMULATION ABORTED.".to_string();
                }
                Err(e) => {
                    state.status = map_api_error(&e, "ERROR: VIDEO ENGINE UNSTABLE.");
                }
            }
            drop(state);
            busy.store(false, Ordering::SeqCst);
            request_repaint();
        });
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("SIMULATION ENGINE").color(COLOR_WARN).small());
            ui.separator();
            ui.add(
                egui::TextEdit::singleline(&mut self.prompt)
                    .hint_text("DESCRIBE SCENARIO")
                    .desired_width(ui.available_width() - 240.0),
            );
            let busy = self.busy.load(Ordering::SeqCst);
            if ui.add_enabled(!busy, egui::Button::new("RENDER")).clicked() {
                self.generate();
            }
            let has_image = self.state.lock().unwrap().image.is_some();
            if ui
                .add_enabled(!busy && has_image, egui::Button::new("SIMULATE"))
                .clicked()
            {
                self.animate();
            }
            if busy
                && ui
                    .button(egui::RichText::new("ABORT").color(COLOR_ALERT))
                    .clicked()
            {
                self.cancel.store(true, Ordering::SeqCst);
            }
        });
        ui.separator();

        let (status, image, image_rev, video_path) = {
            let state = self.state.lock().unwrap();
            (
                state.status.clone(),
                state.image.clone(),
                state.image_rev,
                state.video_path.clone(),
            )
        };

        if !status.is_empty() {
            let color = if status.contains("ERROR") || status.contains("CRITICAL") {
                COLOR_ALERT
            } else {
                COLOR_TEXT
            };
            ui.label(egui::RichText::new(&status).color(color).monospace());
        }

        if let Some(png) = image {
            let uri = format!("bytes://simulation-asset-{}.png", image_rev);
            ui.add(
                egui::Image::from_bytes(uri, png)
                    .max_width(ui.available_width())
                    .maintain_aspect_ratio(true),
            );
        } else {
            ui.label(egui::RichText::new("NO ASSET RENDERED.").color(COLOR_DIM));
        }

        if let Some(path) = video_path {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("FOOTAGE").color(COLOR_WARN).small());
                ui.monospace(path.display().to_string());
                if ui.button("OPEN").clicked() {
                    open_video_externally(&path);
                }
            });
        }
    }
}

impl Default for SimulationView {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation clips land next to the session logs.
fn write_video_file(mp4: &[u8]) -> anyhow::Result<PathBuf> {
    let mut dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("machine-console");
    dir.push("simulations");
    std::fs::create_dir_all(&dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("simulation_{}.mp4", stamp));
    std::fs::write(&path, mp4)?;
    Ok(path)
}

fn open_video_externally(path: &std::path::Path) {
    #[cfg(target_os = "windows")]
    let opener = "explorer";
    #[cfg(target_os = "macos")]
    let opener = "open";
    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    let opener = "xdg-open";

    if let Err(e) = std::process::Command::new(opener).arg(path).spawn() {
        log_info!("Failed to open video player: {}", e);
    }
}
