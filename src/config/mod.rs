//! Persistent console configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::log_info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: String,
    pub voice_name: String,
    pub show_mission_overlays: bool,
    pub typewriter_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            voice_name: crate::api::tts::TTS_VOICE.to_string(),
            show_mission_overlays: true,
            typewriter_delay_ms: 20,
        }
    }
}

pub fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_default()
        .join("machine-console");
    let _ = std::fs::create_dir_all(&config_dir);
    config_dir.join("config.json")
}

pub fn load_config() -> Config {
    load_config_from(&get_config_path())
}

/// Unknown fields are ignored and missing fields take defaults, so configs
/// survive version changes in both directions.
pub fn load_config_from(path: &Path) -> Config {
    if path.exists() {
        let data = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&data).unwrap_or_default()
    } else {
        Config::default()
    }
}

pub fn save_config(config: &Config) {
    save_config_to(config, &get_config_path());
}

pub fn save_config_to(config: &Config, path: &Path) {
    match serde_json::to_string_pretty(config) {
        Ok(data) => {
            if let Err(e) = std::fs::write(path, data) {
                log_info!("Failed to save config: {}", e);
            }
        }
        Err(e) => log_info!("Failed to serialize config: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json"));
        assert!(config.gemini_api_key.is_empty());
        assert_eq!(config.voice_name, "Zephyr");
        assert!(config.show_mission_overlays);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            gemini_api_key: "key-123".to_string(),
            voice_name: "Kore".to_string(),
            show_mission_overlays: false,
            typewriter_delay_ms: 35,
        };
        save_config_to(&config, &path);
        let loaded = load_config_from(&path);
        assert_eq!(loaded.gemini_api_key, "key-123");
        assert_eq!(loaded.voice_name, "Kore");
        assert!(!loaded.show_mission_overlays);
        assert_eq!(loaded.typewriter_delay_ms, 35);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let config = load_config_from(&path);
        assert!(config.gemini_api_key.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"gemini_api_key":"k","legacy_field":42}"#).unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.gemini_api_key, "k");
    }
}
