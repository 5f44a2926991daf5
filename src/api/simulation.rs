//! Tactical asset rendering: still image generation and long-running video
//! animation with a cancellable poll loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use super::client::{self, UREQ_AGENT};
use super::extract_inline_data;

pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Delay between operation polls.
pub const VIDEO_POLL_DELAY: Duration = Duration::from_secs(10);

/// Generated video downloads run well past the default body size limit.
const VIDEO_DOWNLOAD_LIMIT: u64 = 512 * 1024 * 1024;

/// Render a surveillance still for the given subject. Returns PNG bytes.
pub fn generate_tactical_image(prompt: &str) -> Result<Vec<u8>> {
    let api_key = client::api_key()?;

    let styled = format!(
        "A high-contrast surveillance still, thermal or grainy CCTV aesthetic: {}. NYC streets, POI aesthetic, digital UI overlays.",
        prompt
    );
    let payload = serde_json::json!({
        "contents": [{
            "parts": [{ "text": styled }]
        }],
        "generationConfig": {
            "imageConfig": {
                "aspectRatio": "16:9"
            }
        }
    });

    let resp = UREQ_AGENT
        .post(&client::model_url(IMAGE_MODEL, "generateContent"))
        .header("x-goog-api-key", &api_key)
        .send_json(payload)
        .map_err(|e| anyhow::anyhow!("Image generation failed: {}", e))?;

    let json: Value = resp.into_body().read_json()?;
    extract_inline_data(&json).ok_or_else(|| anyhow::anyhow!("No image in response"))
}

/// Animate a rendered still into surveillance footage. Blocks through the
/// poll loop; flip `cancel` from another thread to abandon the operation.
/// Returns the MP4 bytes.
pub fn animate_asset(image_png: &[u8], prompt: &str, cancel: &AtomicBool) -> Result<Vec<u8>> {
    let api_key = client::api_key()?;

    let payload = serde_json::json!({
        "instances": [{
            "prompt": format!("Surveillance footage animation: {}", prompt),
            "image": {
                "bytesBase64Encoded": crate::live::codec::encode(image_png),
                "mimeType": "image/png"
            }
        }],
        "parameters": {
            "sampleCount": 1,
            "resolution": "720p",
            "aspectRatio": "16:9"
        }
    });

    let resp = UREQ_AGENT
        .post(&client::model_url(VIDEO_MODEL, "predictLongRunning"))
        .header("x-goog-api-key", &api_key)
        .send_json(payload)
        .map_err(|e| anyhow::anyhow!("Animation request failed: {}", e))?;
    let initial: Value = resp.into_body().read_json()?;

    let operation = await_operation(
        initial,
        |name| {
            let url = format!(
                "https://generativelanguage.googleapis.com/v1beta/{}",
                name
            );
            let resp = UREQ_AGENT
                .get(&url)
                .header("x-goog-api-key", &api_key)
                .call()
                .map_err(|e| anyhow::anyhow!("Operation poll failed: {}", e))?;
            Ok(resp.into_body().read_json()?)
        },
        VIDEO_POLL_DELAY,
        cancel,
    )?;

    let uri =
        operation_video_uri(&operation).ok_or_else(|| anyhow::anyhow!("No video in operation"))?;

    download_video(&uri, &api_key)
}

/// Poll a long-running operation until it reports done. The cancel token is
/// checked before every wait, so an abort never costs more than the current
/// in-flight poll.
pub fn await_operation<F>(
    initial: Value,
    mut poll: F,
    delay: Duration,
    cancel: &AtomicBool,
) -> Result<Value>
where
    F: FnMut(&str) -> Result<Value>,
{
    let mut operation = initial;
    loop {
        if operation.get("done").and_then(Value::as_bool) == Some(true) {
            if let Some(error) = operation.get("error") {
                return Err(anyhow::anyhow!("Operation failed: {}", error));
            }
            return Ok(operation);
        }
        if cancel.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Operation cancelled"));
        }
        std::thread::sleep(delay);
        if cancel.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Operation cancelled"));
        }
        let name = operation
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Operation has no name"))?;
        operation = poll(name)?;
    }
}

/// Find the generated video URI inside a finished operation.
pub fn operation_video_uri(operation: &Value) -> Option<String> {
    let response = operation.get("response")?;
    let video = response
        .get("generateVideoResponse")
        .and_then(|r| r.get("generatedSamples"))
        .and_then(Value::as_array)
        .and_then(|s| s.get(0))
        .and_then(|s| s.get("video"))
        .or_else(|| {
            response
                .get("generatedVideos")
                .and_then(Value::as_array)
                .and_then(|v| v.get(0))
                .and_then(|v| v.get("video"))
        })?;
    video
        .get("uri")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn download_video(uri: &str, api_key: &str) -> Result<Vec<u8>> {
    let separator = if uri.contains('?') { '&' } else { '?' };
    let url = format!("{}{}key={}", uri, separator, api_key);
    let resp = UREQ_AGENT
        .get(&url)
        .call()
        .map_err(|e| anyhow::anyhow!("Video download failed: {}", e))?;
    let bytes = resp
        .into_body()
        .with_config()
        .limit(VIDEO_DOWNLOAD_LIMIT)
        .read_to_vec()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn pending_operation_is_polled_until_done() {
        let polled = Mutex::new(0usize);
        let cancel = AtomicBool::new(false);
        let result = await_operation(
            json!({"name": "operations/sim-1", "done": false}),
            |name| {
                assert_eq!(name, "operations/sim-1");
                let mut count = polled.lock().unwrap();
                *count += 1;
                if *count < 2 {
                    Ok(json!({"name": "operations/sim-1", "done": false}))
                } else {
                    Ok(json!({"name": "operations/sim-1", "done": true, "response": {}}))
                }
            },
            Duration::from_millis(1),
            &cancel,
        )
        .unwrap();
        assert_eq!(*polled.lock().unwrap(), 2);
        assert_eq!(result.get("done"), Some(&json!(true)));
    }

    #[test]
    fn already_done_operation_never_polls() {
        let cancel = AtomicBool::new(false);
        let result = await_operation(
            json!({"done": true, "response": {}}),
            |_| panic!("must not poll"),
            Duration::from_millis(1),
            &cancel,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn cancellation_stops_the_loop_before_the_next_poll() {
        let cancel = AtomicBool::new(true);
        let err = await_operation(
            json!({"name": "operations/sim-2", "done": false}),
            |_| panic!("must not poll after cancel"),
            Duration::from_millis(1),
            &cancel,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn finished_operation_with_error_is_a_failure() {
        let cancel = AtomicBool::new(false);
        let err = await_operation(
            json!({"done": true, "error": {"message": "quota"}}),
            |_| panic!("must not poll"),
            Duration::from_millis(1),
            &cancel,
        )
        .unwrap_err();
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn video_uri_is_found_in_either_response_shape() {
        let sampled = json!({
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        {"video": {"uri": "https://dl.example/v1.mp4"}}
                    ]
                }
            }
        });
        assert_eq!(
            operation_video_uri(&sampled).as_deref(),
            Some("https://dl.example/v1.mp4")
        );

        let legacy = json!({
            "response": {
                "generatedVideos": [
                    {"video": {"uri": "https://dl.example/v2.mp4"}}
                ]
            }
        });
        assert_eq!(
            operation_video_uri(&legacy).as_deref(),
            Some("https://dl.example/v2.mp4")
        );

        assert_eq!(operation_video_uri(&json!({"response": {}})), None);
    }
}
