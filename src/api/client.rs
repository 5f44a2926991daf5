//! Shared HTTP client and credential lookup for the generative endpoints.

use std::time::Duration;

use anyhow::Result;
use lazy_static::lazy_static;

use crate::APP;

/// REST base for the generative language models.
pub const GENLANG_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

lazy_static! {
    /// One agent for every REST call. Generation requests can run long, so
    /// the global timeout is generous; connect failures still surface fast.
    pub static ref UREQ_AGENT: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(180)))
        .build()
        .new_agent();
}

/// Resolve the Gemini API key: environment first, stored config second.
pub fn api_key() -> Result<String> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }
    if let Ok(app) = APP.lock() {
        if !app.config.gemini_api_key.trim().is_empty() {
            return Ok(app.config.gemini_api_key.clone());
        }
    }
    Err(anyhow::anyhow!("NO_API_KEY:gemini"))
}

/// Whether an error means no credential was configured at all, as opposed
/// to a request that failed.
pub fn is_not_configured(err: &anyhow::Error) -> bool {
    err.to_string().starts_with("NO_API_KEY:")
}

pub fn model_url(model: &str, action: &str) -> String {
    format!("{}/{}:{}", GENLANG_BASE, model, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_error_is_recognized() {
        let err = anyhow::anyhow!("NO_API_KEY:gemini");
        assert!(is_not_configured(&err));
        let other = anyhow::anyhow!("Request failed: 500");
        assert!(!is_not_configured(&other));
    }

    #[test]
    fn model_urls_target_the_rest_base() {
        assert_eq!(
            model_url("gemini-3-flash-preview", "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }
}
