//! Command-channel chat with the Machine persona.

use anyhow::Result;
use serde_json::Value;

use super::client::{self, UREQ_AGENT};
use super::extract_text;

pub const CHAT_MODEL: &str = "gemini-3-flash-preview";

const SYSTEM_INSTRUCTION: &str = "You are 'The Machine'. You communicate in clinical, tactical, and brief sentences. You are loyal to 'Admin' (the user). Provide mission updates and handle inquiries with total surveillance-based authority. Use uppercase for critical warnings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    fn wire_name(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Multi-turn chat session. Every request replays the full history so the
/// model keeps context across turns.
pub struct ChatSession {
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Send one user message and append the model reply to the history.
    pub fn send(&mut self, message: &str) -> Result<String> {
        let api_key = client::api_key()?;
        self.exchange(message, |history| request(history, &api_key))
    }

    /// Append the user turn, run the request against the updated history
    /// and keep the reply. On failure the user turn is removed again, so
    /// the history only ever contains exchanges that completed.
    fn exchange(
        &mut self,
        message: &str,
        perform: impl FnOnce(&[ChatTurn]) -> Result<String>,
    ) -> Result<String> {
        self.history.push(ChatTurn {
            role: ChatRole::User,
            text: message.to_string(),
        });

        match perform(&self.history) {
            Ok(reply) => {
                self.history.push(ChatTurn {
                    role: ChatRole::Model,
                    text: reply.clone(),
                });
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }
}

fn request(history: &[ChatTurn], api_key: &str) -> Result<String> {
    let contents: Vec<Value> = history
        .iter()
        .map(|turn| {
            serde_json::json!({
                "role": turn.role.wire_name(),
                "parts": [{ "text": turn.text }]
            })
        })
        .collect();

    let payload = serde_json::json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": contents
    });

    let resp = UREQ_AGENT
        .post(&client::model_url(CHAT_MODEL, "generateContent"))
        .header("x-goog-api-key", api_key)
        .send_json(payload)
        .map_err(|e| anyhow::anyhow!("Chat request failed: {}", e))?;

    let json: Value = resp.into_body().read_json()?;
    extract_text(&json).ok_or_else(|| anyhow::anyhow!("Empty chat response"))
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_starts_empty() {
        assert!(ChatSession::new().history().is_empty());
    }

    #[test]
    fn failed_exchange_rolls_back_the_user_turn() {
        let mut session = ChatSession::new();
        let err = session
            .exchange("status report", |_| Err(anyhow::anyhow!("link down")))
            .unwrap_err();
        assert_eq!(err.to_string(), "link down");
        assert!(session.history().is_empty());
    }

    #[test]
    fn successful_exchange_keeps_both_turns() {
        let mut session = ChatSession::new();
        let reply = session
            .exchange("status report", |history| {
                // The request sees the user turn it is answering.
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].role, ChatRole::User);
                assert_eq!(history[0].text, "status report");
                Ok("ALL SYSTEMS NOMINAL.".to_string())
            })
            .unwrap();
        assert_eq!(reply, "ALL SYSTEMS NOMINAL.");
        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, ChatRole::Model);
        assert_eq!(history[1].text, "ALL SYSTEMS NOMINAL.");
    }

    #[test]
    fn roles_use_wire_names() {
        assert_eq!(ChatRole::User.wire_name(), "user");
        assert_eq!(ChatRole::Model.wire_name(), "model");
    }
}
