//! Intelligence node: grounded search with cited sources and a tactical map.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eframe::egui;
use rand::Rng;

use crate::api::search::{search_intelligence, IntelReport};

use super::{
    map_api_error, request_repaint, COLOR_ALERT, COLOR_DIM, COLOR_MARK, COLOR_TEXT, COLOR_WARN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeType {
    Threat,
    Asset,
    Neutral,
}

#[derive(Debug, Clone, Copy)]
struct MapNode {
    top: f32,
    left: f32,
    kind: NodeType,
}

fn initial_map_nodes() -> Vec<MapNode> {
    vec![
        MapNode { top: 25.0, left: 30.0, kind: NodeType::Asset },
        MapNode { top: 45.0, left: 60.0, kind: NodeType::Threat },
        MapNode { top: 15.0, left: 75.0, kind: NodeType::Neutral },
        MapNode { top: 80.0, left: 20.0, kind: NodeType::Asset },
        MapNode { top: 60.0, left: 40.0, kind: NodeType::Neutral },
    ]
}

#[derive(Default)]
struct IntelState {
    report: Option<IntelReport>,
    error: Option<String>,
    /// Completed searches, successful or not.
    completed: usize,
}

pub struct IntelligenceView {
    query: String,
    state: Arc<Mutex<IntelState>>,
    busy: Arc<AtomicBool>,
    nodes: Vec<MapNode>,
    shuffles_applied: usize,
}

impl IntelligenceView {
    pub fn new() -> Self {
        Self {
            query: String::new(),
            state: Arc::new(Mutex::new(IntelState::default())),
            busy: Arc::new(AtomicBool::new(false)),
            nodes: initial_map_nodes(),
            shuffles_applied: 0,
        }
    }

    fn search(&mut self) {
        let query = self.query.trim().to_string();
        if query.is_empty() || self.busy.load(Ordering::SeqCst) {
            return;
        }
        self.busy.store(true, Ordering::SeqCst);
        let state = self.state.clone();
        let busy = self.busy.clone();
        std::thread::spawn(move || {
            let result = search_intelligence(&query);
            {
                let mut state = state.lock().unwrap();
                match result {
                    Ok(report) => {
                        state.report = Some(report);
                        state.error = None;
                    }
                    Err(e) => {
                        state.error = Some(map_api_error(
                            &e,
                            "COMMUNICATION ERROR. SATELLITE LINK COMPROMISED.",
                        ));
                    }
                }
                state.completed += 1;
            }
            busy.store(false, Ordering::SeqCst);
            request_repaint();
        });
    }

    /// Jitter the map once per completed search to simulate a tracking
    /// update.
    fn shuffle_nodes(&mut self) {
        let mut rng = rand::thread_rng();
        for node in &mut self.nodes {
            node.top += rng.gen_range(-2.0..=2.0);
            node.left += rng.gen_range(-2.0..=2.0);
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        let (report, error, completed) = {
            let state = self.state.lock().unwrap();
            (state.report.clone(), state.error.clone(), state.completed)
        };
        if completed > self.shuffles_applied {
            self.shuffles_applied = completed;
            self.shuffle_nodes();
        }

        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("NEURAL INTELLIGENCE NODE")
                    .color(COLOR_WARN)
                    .small(),
            );
            ui.separator();
            let resp = ui.add(
                egui::TextEdit::singleline(&mut self.query)
                    .hint_text("QUERY SUBJECT OR EVENT")
                    .desired_width(ui.available_width() - 90.0),
            );
            let submitted = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("SEARCH").clicked() || submitted {
                self.search();
            }
        });
        ui.separator();

        ui.columns(2, |cols| {
            {
                // Left: tactical map.
                let ui = &mut cols[0];
                let (rect, _) = ui.allocate_exact_size(
                    egui::vec2(ui.available_width(), ui.available_height().max(200.0)),
                    egui::Sense::hover(),
                );
                let painter = ui.painter_at(rect);
                painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(2, 2, 2));
                for node in &self.nodes {
                    let pos = egui::pos2(
                        rect.left() + rect.width() * node.left / 100.0,
                        rect.top() + rect.height() * node.top / 100.0,
                    );
                    let color = match node.kind {
                        NodeType::Threat => COLOR_ALERT,
                        NodeType::Asset => COLOR_MARK,
                        NodeType::Neutral => COLOR_WARN,
                    };
                    painter.circle_stroke(pos, 6.0, egui::Stroke::new(1.5, color));
                    painter.circle_filled(pos, 2.0, color);
                }
            }

            {
                // Right: report and citations.
                let ui = &mut cols[1];
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if let Some(error) = &error {
                        ui.label(egui::RichText::new(error).color(COLOR_ALERT).monospace());
                    } else if let Some(report) = &report {
                        ui.label(
                            egui::RichText::new(&report.text)
                                .color(COLOR_TEXT)
                                .monospace(),
                        );
                        if !report.sources.is_empty() {
                            ui.add_space(10.0);
                            ui.label(egui::RichText::new("SOURCES").color(COLOR_WARN).small());
                            for source in &report.sources {
                                let title = source.title.as_deref().unwrap_or(&source.uri);
                                ui.hyperlink_to(title, &source.uri);
                            }
                        }
                    } else if self.busy.load(Ordering::SeqCst) {
                        ui.label(egui::RichText::new("QUERYING...").color(COLOR_DIM));
                    } else {
                        ui.label(
                            egui::RichText::new("SATELLITE LINK: ACTIVE. AWAITING QUERY.")
                                .color(COLOR_DIM),
                        );
                    }
                });
            }
        });
    }
}

impl Default for IntelligenceView {
    fn default() -> Self {
        Self::new()
    }
}
