//! Boot screen: the opening monologue plus credential and voice settings.

use std::time::Duration;

use eframe::egui;

use crate::api::tts;
use crate::config::save_config;
use crate::hud::Typewriter;
use crate::APP;

use super::{COLOR_ALERT, COLOR_DIM, COLOR_TEXT};

pub struct LandingView {
    typewriter: Typewriter,
    api_key_input: String,
    voice_input: String,
    settings_loaded: bool,
}

impl LandingView {
    pub fn new() -> Self {
        let delay = APP
            .lock()
            .map(|app| app.config.typewriter_delay_ms)
            .unwrap_or(20);
        let mut typewriter = Typewriter::new(Duration::from_millis(delay));
        typewriter.set_text(tts::INTRO_MONOLOGUE);
        Self {
            typewriter,
            api_key_input: String::new(),
            voice_input: String::new(),
            settings_loaded: false,
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        if !self.settings_loaded {
            if let Ok(app) = APP.lock() {
                self.api_key_input = app.config.gemini_api_key.clone();
                self.voice_input = app.config.voice_name.clone();
            }
            self.settings_loaded = true;
        }

        self.typewriter.tick();

        ui.add_space(40.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(self.typewriter.visible())
                    .color(COLOR_TEXT)
                    .monospace()
                    .size(18.0),
            );
        });

        ui.add_space(20.0);
        ui.vertical_centered(|ui| {
            if ui.button("AUDIO BRIEFING").clicked() {
                let voice = if self.voice_input.trim().is_empty() {
                    tts::TTS_VOICE.to_string()
                } else {
                    self.voice_input.clone()
                };
                tts::speak_intro(voice);
            }
        });

        ui.add_space(40.0);
        ui.separator();
        ui.label(egui::RichText::new("SYSTEM ACCESS").color(COLOR_ALERT).strong());

        let mut changed = false;
        ui.horizontal(|ui| {
            ui.label("API KEY");
            let resp = ui.add(
                egui::TextEdit::singleline(&mut self.api_key_input)
                    .password(true)
                    .desired_width(300.0),
            );
            changed |= resp.changed();
        });
        ui.horizontal(|ui| {
            ui.label("VOICE");
            changed |= ui
                .add(egui::TextEdit::singleline(&mut self.voice_input).desired_width(150.0))
                .changed();
        });
        ui.label(
            egui::RichText::new("Key falls back to the GEMINI_API_KEY environment variable.")
                .color(COLOR_DIM)
                .small(),
        );

        if changed {
            if let Ok(mut app) = APP.lock() {
                app.config.gemini_api_key = self.api_key_input.clone();
                app.config.voice_name = self.voice_input.clone();
                save_config(&app.config);
            }
        }
    }
}

impl Default for LandingView {
    fn default() -> Self {
        Self::new()
    }
}
