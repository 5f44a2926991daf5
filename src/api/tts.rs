//! One-shot speech synthesis for the opening monologue.

use anyhow::Result;
use serde_json::Value;

use super::client::{self, UREQ_AGENT};
use super::extract_inline_data;
use crate::live::playback::{AudioScheduler, OUTPUT_SAMPLE_RATE};
use crate::log_info;

pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const TTS_VOICE: &str = "Zephyr";

pub const INTRO_MONOLOGUE: &str = "You are being watched. The government has a secret system, a machine that spies on you every hour of every day.";

/// Synthesize speech for the given text. Returns raw 24 kHz mono PCM.
pub fn synthesize(text: &str, voice_name: &str) -> Result<Vec<u8>> {
    let api_key = client::api_key()?;

    let payload = serde_json::json!({
        "contents": [{
            "parts": [{ "text": text }]
        }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice_name }
                }
            }
        }
    });

    let resp = UREQ_AGENT
        .post(&client::model_url(TTS_MODEL, "generateContent"))
        .header("x-goog-api-key", &api_key)
        .send_json(payload)
        .map_err(|e| anyhow::anyhow!("Speech synthesis failed: {}", e))?;

    let json: Value = resp.into_body().read_json()?;
    extract_inline_data(&json).ok_or_else(|| anyhow::anyhow!("No audio in response"))
}

/// Speak the opening monologue on a background thread. Synthesis and
/// playback failures are logged, not surfaced; the console keeps running
/// without audio.
pub fn speak_intro(voice_name: String) {
    std::thread::spawn(move || {
        let pcm = match synthesize(INTRO_MONOLOGUE, &voice_name) {
            Ok(pcm) => pcm,
            Err(e) => {
                log_info!("Intro synthesis failed: {}", e);
                return;
            }
        };
        // Playback device lives on this thread; keep it alive until the
        // clip has drained.
        let mut scheduler = AudioScheduler::with_device();
        scheduler.enqueue(&pcm);
        let duration = pcm.len() as f64 / 2.0 / OUTPUT_SAMPLE_RATE as f64;
        std::thread::sleep(std::time::Duration::from_secs_f64(duration + 0.5));
    });
}
