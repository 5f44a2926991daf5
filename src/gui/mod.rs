//! Console shell: one window, five operational views.

pub mod intelligence;
pub mod landing;
pub mod mission;
pub mod simulation;
pub mod surveillance;

use eframe::egui;

pub use intelligence::IntelligenceView;
pub use landing::LandingView;
pub use mission::MissionView;
pub use simulation::SimulationView;
pub use surveillance::SurveillanceView;

lazy_static::lazy_static! {
    /// Egui context handle so background threads can request a repaint
    /// when results land.
    pub static ref GUI_CONTEXT: std::sync::Mutex<Option<egui::Context>> = std::sync::Mutex::new(None);
}

pub fn request_repaint() {
    if let Ok(ctx) = GUI_CONTEXT.lock() {
        if let Some(ctx) = ctx.as_ref() {
            ctx.request_repaint();
        }
    }
}

// Console palette.
pub const COLOR_TEXT: egui::Color32 = egui::Color32::from_rgb(205, 214, 205);
pub const COLOR_DIM: egui::Color32 = egui::Color32::from_rgb(110, 120, 110);
pub const COLOR_ALERT: egui::Color32 = egui::Color32::from_rgb(229, 57, 53);
pub const COLOR_WARN: egui::Color32 = egui::Color32::from_rgb(233, 196, 68);
pub const COLOR_MARK: egui::Color32 = egui::Color32::from_rgb(245, 245, 245);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Landing,
    Mission,
    Intelligence,
    Simulation,
    Surveillance,
}

impl AppMode {
    fn label(&self) -> &'static str {
        match self {
            AppMode::Landing => "SYSTEM",
            AppMode::Mission => "MISSION CONTROL",
            AppMode::Intelligence => "INTELLIGENCE",
            AppMode::Simulation => "SIMULATION",
            AppMode::Surveillance => "SURVEILLANCE",
        }
    }
}

/// User-facing rendering of an API failure. A missing credential reads
/// the same everywhere; anything else keeps the view-specific message.
pub fn map_api_error(err: &anyhow::Error, fallback: &str) -> String {
    if crate::api::client::is_not_configured(err) {
        "CRITICAL: API AUTHENTICATION FAILURE. CORE FUNCTIONALITY DISABLED.".to_string()
    } else {
        fallback.to_string()
    }
}

pub struct ConsoleApp {
    mode: AppMode,
    landing: LandingView,
    mission: MissionView,
    intelligence: IntelligenceView,
    simulation: SimulationView,
    surveillance: SurveillanceView,
}

impl ConsoleApp {
    pub fn new() -> Self {
        Self {
            mode: AppMode::Landing,
            landing: LandingView::new(),
            mission: MissionView::new(),
            intelligence: IntelligenceView::new(),
            simulation: SimulationView::new(),
            surveillance: SurveillanceView::new(),
        }
    }
}

impl Default for ConsoleApp {
    fn default() -> Self {
        Self::new()
    }
}

impl eframe::App for ConsoleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("mode_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new("THE MACHINE")
                        .color(COLOR_ALERT)
                        .strong()
                        .monospace(),
                );
                ui.separator();
                for mode in [
                    AppMode::Landing,
                    AppMode::Mission,
                    AppMode::Intelligence,
                    AppMode::Simulation,
                    AppMode::Surveillance,
                ] {
                    ui.selectable_value(&mut self.mode, mode, mode.label());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.mode {
            AppMode::Landing => self.landing.ui(ui),
            AppMode::Mission => self.mission.ui(ui),
            AppMode::Intelligence => self.intelligence.ui(ui),
            AppMode::Simulation => self.simulation.ui(ui),
            AppMode::Surveillance => self.surveillance.ui(ui),
        });

        // Typewriters and tracking overlays animate without input events.
        ctx.request_repaint_after(std::time::Duration::from_millis(50));
    }
}
