//! REST calls against the generative endpoints plus the helpers shared by
//! all of them.

pub mod chat;
pub mod client;
pub mod search;
pub mod simulation;
pub mod tts;

use serde_json::Value;

/// Pull the first visible text part out of a generateContent response,
/// skipping internal thought parts.
pub fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    for part in parts {
        if part.get("thought").and_then(Value::as_bool) == Some(true) {
            continue;
        }
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Pull the first inline binary payload (image or audio) out of a
/// generateContent response, already base64-decoded.
pub fn extract_inline_data(response: &Value) -> Option<Vec<u8>> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    for part in parts {
        if let Some(data) = part
            .get("inlineData")
            .and_then(|d| d.get("data"))
            .and_then(Value::as_str)
        {
            let bytes = crate::live::codec::decode(data);
            if !bytes.is_empty() {
                return Some(bytes);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_extraction_skips_thought_parts() {
        let resp = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "internal reasoning", "thought": true},
                        {"text": "SURVEILLANCE ACTIVE."}
                    ]
                }
            }]
        });
        assert_eq!(extract_text(&resp).as_deref(), Some("SURVEILLANCE ACTIVE."));
    }

    #[test]
    fn missing_candidates_yield_none() {
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(extract_inline_data(&json!({"candidates": []})), None);
    }

    #[test]
    fn inline_data_is_decoded() {
        let resp = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "here is your image"},
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                    ]
                }
            }]
        });
        assert_eq!(extract_inline_data(&resp), Some(vec![1, 2, 3]));
    }
}
