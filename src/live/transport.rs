//! WebSocket transport for the bidirectional live session.
//!
//! Handles the connect/setup handshake, the client frames (media chunks)
//! and parsing of server messages into typed events. Session policy lives
//! one level up; nothing here touches shared state.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;
use tungstenite::Message;

use super::codec;

/// Native audio model driving the live feed.
pub const LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Microphone uplink sample rate.
pub const INPUT_SAMPLE_RATE: u32 = 16000;

const SETUP_TIMEOUT: Duration = Duration::from_secs(15);

pub type LiveSocket = tungstenite::WebSocket<native_tls::TlsStream<TcpStream>>;

/// Open the TLS websocket to the bidirectional endpoint. The individual
/// handshake phases block, so the cancel flag is checked between them; a
/// teardown requested mid-connect gives up at the next phase boundary.
pub fn connect(api_key: &str, cancel: &AtomicBool) -> Result<LiveSocket> {
    let ws_url = format!(
        "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent?key={}",
        api_key
    );

    ensure_running(cancel)?;

    let url = url::Url::parse(&ws_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("No host in URL"))?;

    use std::net::ToSocketAddrs;
    let addr = format!("{}:443", host)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve hostname: {}", host))?;

    ensure_running(cancel)?;
    let tcp_stream = TcpStream::connect_timeout(&addr, Duration::from_secs(10))?;
    tcp_stream.set_read_timeout(Some(Duration::from_secs(30)))?;
    tcp_stream.set_write_timeout(Some(Duration::from_secs(30)))?;
    tcp_stream.set_nodelay(true)?;

    ensure_running(cancel)?;
    let connector = native_tls::TlsConnector::new()?;
    let tls_stream = connector.connect(host, tcp_stream)?;

    ensure_running(cancel)?;
    let (socket, _response) = tungstenite::client::client(&ws_url, tls_stream)?;
    Ok(socket)
}

fn ensure_running(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::SeqCst) {
        Err(anyhow::anyhow!("Session stopped during connect"))
    } else {
        Ok(())
    }
}

/// Send the session setup frame: native audio out, both transcription
/// directions on, surveillance persona pinned as the system instruction.
pub fn send_setup(socket: &mut LiveSocket, voice_name: &str) -> Result<()> {
    let setup = serde_json::json!({
        "setup": {
            "model": format!("models/{}", LIVE_MODEL),
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {
                            "voiceName": voice_name
                        }
                    }
                }
            },
            "systemInstruction": {
                "parts": [{
                    "text": "You are 'The Machine'. You are monitoring the Admin via their camera feed. Acknowledge visual gestures like waving or movement. Be clinical, protective, and concise. Refer to the user as Admin."
                }]
            },
            "outputAudioTranscription": {},
            "inputAudioTranscription": {}
        }
    });

    socket.write(Message::text(setup.to_string()))?;
    socket.flush()?;
    Ok(())
}

/// Wait for the server to acknowledge the setup frame. Expects the socket
/// to already be on short read timeouts; the cancel flag is checked between
/// reads so a teardown does not sit out the full setup window.
pub fn wait_setup_complete<S>(
    socket: &mut tungstenite::WebSocket<S>,
    cancel: &AtomicBool,
) -> Result<()>
where
    S: Read + Write,
{
    let deadline = Instant::now() + SETUP_TIMEOUT;
    while Instant::now() < deadline {
        if cancel.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Session stopped during setup"));
        }
        match socket.read() {
            Ok(Message::Text(msg)) => {
                if let Ok(json) = serde_json::from_str::<Value>(msg.as_str()) {
                    if json.get("setupComplete").is_some() {
                        return Ok(());
                    }
                }
            }
            Ok(Message::Binary(data)) => {
                if let Ok(json) = serde_json::from_slice::<Value>(&data) {
                    if json.get("setupComplete").is_some() {
                        return Ok(());
                    }
                }
            }
            Ok(Message::Close(_)) => {
                return Err(anyhow::anyhow!("Connection closed during setup"));
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(anyhow::anyhow!("Timed out waiting for setup acknowledgment"))
}

/// Switch the underlying TCP stream to short read timeouts so the session
/// loop can poll the socket without blocking its other duties.
pub fn set_nonblocking_reads(socket: &mut LiveSocket) -> Result<()> {
    socket
        .get_mut()
        .get_mut()
        .set_read_timeout(Some(Duration::from_millis(20)))?;
    Ok(())
}

/// Push one media chunk (JPEG frame or PCM audio) over the uplink.
pub fn send_media_chunk(socket: &mut LiveSocket, mime_type: &str, data: &[u8]) -> Result<()> {
    let msg = serde_json::json!({
        "realtimeInput": {
            "mediaChunks": [{
                "mimeType": mime_type,
                "data": codec::encode(data)
            }]
        }
    });
    socket.write(Message::text(msg.to_string()))?;
    socket.flush()?;
    Ok(())
}

pub fn send_audio_chunk(socket: &mut LiveSocket, samples: &[i16]) -> Result<()> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    send_media_chunk(
        socket,
        &format!("audio/pcm;rate={}", INPUT_SAMPLE_RATE),
        &bytes,
    )
}

/// Typed server events, in the order the session loop must apply them.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Interrupted,
    OutputTranscript(String),
    InputTranscript(String),
    Audio(Vec<u8>),
    TurnComplete,
    GoAway,
}

/// Decode one raw server message into events. A single message can carry
/// several payloads at once; an interruption always sorts first so stale
/// audio is flushed before anything else lands.
pub fn parse_server_events(raw: &str) -> Vec<ServerEvent> {
    let json: Value = match serde_json::from_str(raw) {
        Ok(json) => json,
        Err(_) => return Vec::new(),
    };

    let mut events = Vec::new();

    if json.get("goAway").is_some() {
        events.push(ServerEvent::GoAway);
    }

    let Some(content) = json.get("serverContent") else {
        return events;
    };

    if content.get("interrupted").and_then(Value::as_bool) == Some(true) {
        events.push(ServerEvent::Interrupted);
    }

    if let Some(text) = content
        .get("outputTranscription")
        .and_then(|t| t.get("text"))
        .and_then(Value::as_str)
    {
        if !text.is_empty() {
            events.push(ServerEvent::OutputTranscript(text.to_string()));
        }
    }

    if let Some(text) = content
        .get("inputTranscription")
        .and_then(|t| t.get("text"))
        .and_then(Value::as_str)
    {
        if !text.is_empty() {
            events.push(ServerEvent::InputTranscript(text.to_string()));
        }
    }

    if let Some(parts) = content
        .get("modelTurn")
        .and_then(|t| t.get("parts"))
        .and_then(Value::as_array)
    {
        for part in parts {
            if let Some(data) = part
                .get("inlineData")
                .and_then(|d| d.get("data"))
                .and_then(Value::as_str)
            {
                let pcm = codec::decode(data);
                if !pcm.is_empty() {
                    events.push(ServerEvent::Audio(pcm));
                }
            }
        }
    }

    if content.get("turnComplete").and_then(Value::as_bool) == Some(true) {
        events.push(ServerEvent::TurnComplete);
    }

    events
}
