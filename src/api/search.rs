//! Grounded intelligence search with source attribution.

use anyhow::Result;
use serde_json::Value;

use super::client::{self, UREQ_AGENT};
use super::extract_text;

pub const SEARCH_MODEL: &str = "gemini-3-flash-preview";

const SYSTEM_INSTRUCTION: &str = "You are 'The Machine', an omniscient AI system from Person of Interest. Provide brief, clinical, and tactical intelligence reports. Use typewriter-style short sentences.";

/// One grounding citation. Titles are optional in the metadata; entries
/// without a URI are dropped entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub title: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone)]
pub struct IntelReport {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

/// Run one grounded query and return the report with its citations.
pub fn search_intelligence(query: &str) -> Result<IntelReport> {
    let api_key = client::api_key()?;

    let payload = serde_json::json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": query }]
        }],
        "tools": [{ "google_search": {} }]
    });

    let resp = UREQ_AGENT
        .post(&client::model_url(SEARCH_MODEL, "generateContent"))
        .header("x-goog-api-key", &api_key)
        .send_json(payload)
        .map_err(|e| anyhow::anyhow!("Intelligence query failed: {}", e))?;

    let json: Value = resp.into_body().read_json()?;
    parse_intel_response(&json).ok_or_else(|| anyhow::anyhow!("Empty intelligence response"))
}

/// Split a grounded response into text plus ordered citations.
pub fn parse_intel_response(response: &Value) -> Option<IntelReport> {
    let text = extract_text(response)?;

    let sources = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("groundingMetadata"))
        .and_then(|m| m.get("groundingChunks"))
        .and_then(Value::as_array)
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| {
                    let web = chunk.get("web")?;
                    let uri = web.get("uri").and_then(Value::as_str)?;
                    Some(GroundingSource {
                        title: web
                            .get("title")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        uri: uri.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(IntelReport { text, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_carries_sources_in_metadata_order() {
        let resp = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "SUBJECT LOCATED. TWO RECORDS FOUND." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "title": "City Register", "uri": "https://register.example/a" } },
                        { "web": { "uri": "https://feeds.example/b" } }
                    ]
                }
            }]
        });
        let report = parse_intel_response(&resp).unwrap();
        assert_eq!(report.text, "SUBJECT LOCATED. TWO RECORDS FOUND.");
        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.sources[0].title.as_deref(), Some("City Register"));
        assert_eq!(report.sources[1].title, None);
        assert_eq!(report.sources[1].uri, "https://feeds.example/b");
    }

    #[test]
    fn ungrounded_response_has_no_sources() {
        let resp = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "NO EXTERNAL RECORDS." }] }
            }]
        });
        let report = parse_intel_response(&resp).unwrap();
        assert!(report.sources.is_empty());
    }

    #[test]
    fn response_without_text_is_rejected() {
        assert!(parse_intel_response(&json!({"candidates": []})).is_none());
    }
}
