//! Mission Control: the command chat channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eframe::egui;

use crate::api::chat::ChatSession;
use crate::hud::Typewriter;
use crate::APP;

use super::{map_api_error, request_repaint, COLOR_ALERT, COLOR_DIM, COLOR_MARK, COLOR_TEXT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    Admin,
    Machine,
}

#[derive(Clone)]
struct ConsoleMessage {
    speaker: Speaker,
    text: String,
}

pub struct MissionView {
    input: String,
    messages: Arc<Mutex<Vec<ConsoleMessage>>>,
    session: Arc<Mutex<ChatSession>>,
    busy: Arc<AtomicBool>,
    typewriter: Typewriter,
}

impl MissionView {
    pub fn new() -> Self {
        let delay = APP
            .lock()
            .map(|app| app.config.typewriter_delay_ms)
            .unwrap_or(20);
        Self {
            input: String::new(),
            messages: Arc::new(Mutex::new(vec![ConsoleMessage {
                speaker: Speaker::Machine,
                text: "SYSTEM ONLINE. STANDING BY FOR COMMANDS, ADMIN.".to_string(),
            }])),
            session: Arc::new(Mutex::new(ChatSession::new())),
            busy: Arc::new(AtomicBool::new(false)),
            typewriter: Typewriter::new(Duration::from_millis(delay)),
        }
    }

    fn send(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.busy.load(Ordering::SeqCst) {
            return;
        }
        self.input.clear();
        self.messages.lock().unwrap().push(ConsoleMessage {
            speaker: Speaker::Admin,
            text: text.clone(),
        });
        self.busy.store(true, Ordering::SeqCst);

        let messages = self.messages.clone();
        let session = self.session.clone();
        let busy = self.busy.clone();
        std::thread::spawn(move || {
            let result = session.lock().unwrap().send(&text);
            let reply = match result {
                Ok(reply) if !reply.trim().is_empty() => reply,
                Ok(_) => "UNABLE TO COMPUTE.".to_string(),
                Err(e) => map_api_error(&e, "ERROR: SATELLITE LINK INTERRUPTED."),
            };
            messages.lock().unwrap().push(ConsoleMessage {
                speaker: Speaker::Machine,
                text: reply,
            });
            busy.store(false, Ordering::SeqCst);
            request_repaint();
        });
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        let messages = self.messages.lock().unwrap().clone();

        // Latest machine reply types itself out; history renders in full.
        if let Some(last) = messages.last() {
            if last.speaker == Speaker::Machine {
                self.typewriter.set_text(&last.text);
                self.typewriter.tick();
            }
        }

        egui::TopBottomPanel::bottom("mission_input")
            .show_inside(ui, |ui| {
                ui.horizontal(|ui| {
                    let resp = ui.add(
                        egui::TextEdit::singleline(&mut self.input)
                            .hint_text("ENTER COMMAND")
                            .desired_width(ui.available_width() - 90.0),
                    );
                    let submitted =
                        resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if ui.button("TRANSMIT").clicked() || submitted {
                        self.send();
                        resp.request_focus();
                    }
                });
            });

        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(ui, |ui| {
                let last_idx = messages.len().saturating_sub(1);
                for (i, msg) in messages.iter().enumerate() {
                    let (name, color) = match msg.speaker {
                        Speaker::Admin => ("Admin", COLOR_MARK),
                        Speaker::Machine => ("The Machine", COLOR_ALERT),
                    };
                    ui.label(egui::RichText::new(name).color(color).small());
                    let text = if i == last_idx && msg.speaker == Speaker::Machine {
                        self.typewriter.visible()
                    } else {
                        msg.text.as_str()
                    };
                    ui.label(egui::RichText::new(text).color(COLOR_TEXT).monospace());
                    ui.add_space(8.0);
                }
                if self.busy.load(Ordering::SeqCst) {
                    ui.label(egui::RichText::new("PROCESSING...").color(COLOR_DIM).small());
                }
            });
    }
}

impl Default for MissionView {
    fn default() -> Self {
        Self::new()
    }
}
