//! Surveillance deck: the live tactical feed with behavioral transcript,
//! threat gauge and target tracking overlays.

use std::time::Instant;

use eframe::egui;

use crate::api::client;
use crate::hud::{
    regenerate_tracked_items, LineKind, Role, SignalColor, TrackedItem, THREAT_MAX,
    TARGET_LOCK_STEP, TRACK_TICK,
};
use crate::live::{LiveSessionController, SessionState, SyntheticFeed};
use crate::APP;

use super::{map_api_error, COLOR_ALERT, COLOR_DIM, COLOR_MARK, COLOR_TEXT, COLOR_WARN};

const FEED_WIDTH: u32 = 640;
const FEED_HEIGHT: u32 = 360;

pub struct SurveillanceView {
    controller: Option<LiveSessionController>,
    tracked: Vec<TrackedItem>,
    last_track_tick: Instant,
    deploy_error: Option<String>,
}

impl SurveillanceView {
    pub fn new() -> Self {
        Self {
            controller: None,
            tracked: Vec::new(),
            last_track_tick: Instant::now(),
            deploy_error: None,
        }
    }

    fn deploy(&mut self) {
        self.deploy_error = None;
        let api_key = match client::api_key() {
            Ok(key) => key,
            Err(e) => {
                self.deploy_error = Some(map_api_error(&e, "UPLINK FAILURE."));
                return;
            }
        };
        let voice = APP
            .lock()
            .map(|app| app.config.voice_name.clone())
            .unwrap_or_else(|_| crate::api::tts::TTS_VOICE.to_string());

        let mut controller = LiveSessionController::new();
        if let Err(e) = controller.open(api_key, SyntheticFeed::new(FEED_WIDTH, FEED_HEIGHT), voice)
        {
            self.deploy_error = Some(format!("DEPLOYMENT FAILED: {}", e));
            return;
        }
        self.controller = Some(controller);
    }

    fn disengage(&mut self) {
        // Dropping the controller closes the session; the next deploy gets
        // a fresh one, so the Closed state never blocks redeployment.
        if let Some(mut controller) = self.controller.take() {
            controller.close();
        }
        self.tracked.clear();
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        let state = self
            .controller
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(SessionState::Idle);

        // A session that died on its own still needs its controller reaped.
        if state == SessionState::Closed {
            self.disengage();
        }

        let threat_level = self
            .controller
            .as_ref()
            .map(|c| c.shared().with_hud(|hud| hud.threat.level()))
            .unwrap_or(0);

        if state == SessionState::Active && self.last_track_tick.elapsed() >= TRACK_TICK {
            self.last_track_tick = Instant::now();
            self.tracked = regenerate_tracked_items(threat_level, &mut rand::thread_rng());
        }

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("SURVEILLANCE DECK").color(COLOR_WARN).small());
            ui.separator();
            match state {
                SessionState::Idle | SessionState::Closed => {
                    if ui.button("ACTIVATE SURVEILLANCE").clicked() {
                        self.deploy();
                    }
                }
                SessionState::Connecting => {
                    ui.label(egui::RichText::new("ESTABLISHING UPLINK...").color(COLOR_DIM));
                    if ui.button("ABORT").clicked() {
                        self.disengage();
                    }
                }
                SessionState::Active => {
                    ui.label(egui::RichText::new("FEED LIVE").color(COLOR_ALERT).strong());
                    if ui.button("DISENGAGE").clicked() {
                        self.disengage();
                    }
                }
            }
        });
        if let Some(error) = &self.deploy_error {
            ui.label(egui::RichText::new(error).color(COLOR_ALERT).monospace());
        }
        ui.separator();

        ui.columns(2, |cols| {
            {
                let ui = &mut cols[0];
                self.feed_panel(ui);
            }
            {
                let ui = &mut cols[1];
                self.transcript_panel(ui, threat_level);
            }
        });
    }

    fn feed_panel(&mut self, ui: &mut egui::Ui) {
        let (rect, resp) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), ui.available_height().max(240.0)),
            egui::Sense::click(),
        );
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(4, 6, 4));

        if self.controller.is_none() {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "FEED OFFLINE",
                egui::FontId::monospace(16.0),
                COLOR_DIM,
            );
            return;
        }

        let mut locked = false;
        for item in &self.tracked {
            let item_rect = egui::Rect::from_min_size(
                egui::pos2(
                    rect.left() + rect.width() * item.left / 100.0,
                    rect.top() + rect.height() * item.top / 100.0,
                ),
                egui::vec2(
                    rect.width() * item.w / 100.0,
                    rect.height() * item.h / 100.0,
                ),
            );
            let color = match item.color {
                SignalColor::White => COLOR_MARK,
                SignalColor::Yellow => COLOR_WARN,
                SignalColor::Red => COLOR_ALERT,
            };
            painter.rect_stroke(
                item_rect,
                0.0,
                egui::Stroke::new(1.5, color),
                egui::StrokeKind::Outside,
            );
            painter.text(
                item_rect.left_top() - egui::vec2(0.0, 4.0),
                egui::Align2::LEFT_BOTTOM,
                &item.label,
                egui::FontId::monospace(10.0),
                color,
            );

            if resp.clicked()
                && resp
                    .interact_pointer_pos()
                    .map(|p| item_rect.contains(p))
                    .unwrap_or(false)
            {
                locked = true;
            }
        }

        if locked {
            if let Some(controller) = &self.controller {
                controller.shared().with_hud(|hud| {
                    hud.transcript.push(
                        Role::Analysis,
                        "[ASSET_LOCK]: TARGET_ACQUIRED_BY_ADMIN".to_string(),
                        LineKind::Log,
                    );
                    hud.threat.bump(TARGET_LOCK_STEP);
                });
            }
        }
    }

    fn transcript_panel(&self, ui: &mut egui::Ui, threat_level: i32) {
        ui.label(egui::RichText::new("THREAT ASSESSMENT").color(COLOR_WARN).small());
        let fraction = threat_level as f32 / THREAT_MAX as f32;
        let bar = egui::ProgressBar::new(fraction)
            .text(format!("{}%", threat_level))
            .fill(if threat_level > 70 {
                COLOR_ALERT
            } else if threat_level > 30 {
                COLOR_WARN
            } else {
                COLOR_DIM
            });
        ui.add(bar);
        ui.add_space(6.0);

        ui.label(egui::RichText::new("BEHAVIORAL TRANSCRIPT").color(COLOR_WARN).small());
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(ui, |ui| {
                let Some(controller) = &self.controller else {
                    ui.label(egui::RichText::new("NO ACTIVE SESSION.").color(COLOR_DIM));
                    return;
                };
                controller.shared().with_hud(|hud| {
                    for line in hud.transcript.lines() {
                        let color = match (line.role, line.kind) {
                            (Role::Error, _) => COLOR_ALERT,
                            (_, LineKind::Gesture) => COLOR_WARN,
                            (Role::Admin, _) => COLOR_MARK,
                            (Role::Analysis, _) => COLOR_DIM,
                            _ => COLOR_TEXT,
                        };
                        ui.label(
                            egui::RichText::new(format!("{}> {}", line.role.label(), line.text))
                                .color(color)
                                .monospace(),
                        );
                    }
                });
            });
    }
}

impl Default for SurveillanceView {
    fn default() -> Self {
        Self::new()
    }
}
