//! Live session lifecycle and event handling.
//!
//! One controller owns one session. The websocket, the playback scheduler
//! and the microphone stream all live on the session worker thread; the GUI
//! thread only touches the shared state behind `SessionShared`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::hud::{LineKind, Role, SurveillanceHud};
use crate::log_info;

use super::capture::{CapturePipeline, FrameSource};
use super::classify::classify;
use super::playback::AudioScheduler;
use super::transport::{self, ServerEvent};

/// How often buffered microphone audio is flushed over the uplink.
const MIC_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Closed,
}

/// State visible to both the GUI thread and the session worker.
pub struct SessionShared {
    state: Mutex<SessionState>,
    stop: AtomicBool,
    hud: Mutex<SurveillanceHud>,
}

impl SessionShared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Idle),
            stop: AtomicBool::new(false),
            hud: Mutex::new(SurveillanceHud::new()),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap() = state;
    }

    /// A session is live while it is Active and nobody asked it to stop.
    /// Everything that mutates the HUD checks this first, so events still
    /// in flight when the session ends are discarded instead of applied.
    pub fn is_live(&self) -> bool {
        !self.stop.load(Ordering::SeqCst) && self.state() == SessionState::Active
    }

    pub fn mark_closed(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.set_state(SessionState::Closed);
    }

    pub fn with_hud<T>(&self, f: impl FnOnce(&mut SurveillanceHud) -> T) -> T {
        f(&mut self.hud.lock().unwrap())
    }

    fn push_line(&self, role: Role, text: &str, kind: LineKind) {
        self.with_hud(|hud| hud.transcript.push(role, text.to_string(), kind));
    }
}

impl Default for SessionShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply one server event to the shared state and the playback scheduler.
/// Events arriving after the session stopped being live are dropped whole.
pub fn dispatch_server_event(
    shared: &SessionShared,
    scheduler: &mut AudioScheduler,
    event: ServerEvent,
) {
    if !shared.is_live() {
        return;
    }
    match event {
        ServerEvent::Interrupted => scheduler.interrupt(),
        ServerEvent::Audio(pcm) => {
            scheduler.enqueue(&pcm);
        }
        ServerEvent::OutputTranscript(text) => {
            let verdict = classify(&text);
            shared.with_hud(|hud| {
                hud.transcript
                    .push(Role::Machine, text.clone(), LineKind::Chat);
                if verdict.gesture {
                    hud.transcript.push(
                        Role::Analysis,
                        "[GESTURE_DETECTED]: WAVE_SIG_01".to_string(),
                        LineKind::Gesture,
                    );
                }
                if verdict.motion {
                    hud.transcript.push(
                        Role::Analysis,
                        "[MOTION_TRACKING]: ACTIVE_VECTORS".to_string(),
                        LineKind::Log,
                    );
                }
                hud.threat.bump(verdict.threat_delta);
            });
        }
        ServerEvent::InputTranscript(text) => {
            shared.push_line(Role::Admin, &text, LineKind::Chat);
        }
        ServerEvent::TurnComplete | ServerEvent::GoAway => {}
    }
}

/// Offer one encoded frame to the uplink queue. The queue holds a single
/// frame; when the worker is behind, the new frame is dropped on the floor
/// rather than queued behind stale ones. Returns whether it was accepted.
pub fn send_frame(shared: &SessionShared, tx: &SyncSender<Vec<u8>>, jpeg: Vec<u8>) -> bool {
    if !shared.is_live() {
        return false;
    }
    match tx.try_send(jpeg) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
    }
}

pub struct LiveSessionController {
    shared: Arc<SessionShared>,
    worker: Option<JoinHandle<()>>,
    capture: Option<CapturePipeline>,
}

impl LiveSessionController {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SessionShared::new()),
            worker: None,
            capture: None,
        }
    }

    pub fn shared(&self) -> &Arc<SessionShared> {
        &self.shared
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Deploy the session. Calling open while already Connecting or Active
    /// is a no-op; a Closed controller cannot be reused. Hardware access is
    /// probed before any state transition, so a denied camera or microphone
    /// leaves the controller Idle and re-triggerable.
    pub fn open<S>(&mut self, api_key: String, mut source: S, voice_name: String) -> Result<()>
    where
        S: FrameSource + 'static,
    {
        match self.shared.state() {
            SessionState::Connecting | SessionState::Active => return Ok(()),
            SessionState::Closed => {
                return Err(anyhow::anyhow!("Session already closed; deploy a new one"))
            }
            SessionState::Idle => {}
        }

        source
            .grab()
            .map_err(|e| anyhow::anyhow!("Camera access failed: {}", e))?;
        if cpal::default_host().default_input_device().is_none() {
            return Err(anyhow::anyhow!("Microphone access failed: no input device"));
        }

        self.shared.set_state(SessionState::Connecting);

        let (frame_tx, frame_rx) = sync_channel::<Vec<u8>>(1);

        let worker_shared = self.shared.clone();
        self.worker = Some(std::thread::spawn(move || {
            run_session_worker(worker_shared, frame_rx, api_key, voice_name);
        }));

        let capture_shared = self.shared.clone();
        self.capture = Some(CapturePipeline::start(source, move |jpeg| {
            send_frame(&capture_shared, &frame_tx, jpeg);
            capture_shared.state() != SessionState::Closed
        }));

        Ok(())
    }

    /// Tear the session down. An active worker is joined; one still in the
    /// connect handshake is detached instead, since its blocking phases only
    /// notice the stop flag at the next boundary and the caller is usually
    /// the GUI thread. Closing a session that never opened leaves it Idle.
    pub fn close(&mut self) {
        if self.worker.is_none() && self.state() == SessionState::Idle {
            return;
        }
        let was_connecting = self.state() == SessionState::Connecting;
        self.shared.stop.store(true, Ordering::SeqCst);
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(worker) = self.worker.take() {
            if was_connecting {
                drop(worker);
            } else {
                let _ = worker.join();
            }
        }
        self.shared.set_state(SessionState::Closed);
        log_info!("Live session closed");
    }
}

impl Default for LiveSessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LiveSessionController {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_session_worker(
    shared: Arc<SessionShared>,
    frame_rx: Receiver<Vec<u8>>,
    api_key: String,
    voice_name: String,
) {
    let mut socket = match transport::connect(&api_key, &shared.stop)
        .and_then(|mut socket| {
            transport::send_setup(&mut socket, &voice_name)?;
            transport::set_nonblocking_reads(&mut socket)?;
            transport::wait_setup_complete(&mut socket, &shared.stop)?;
            Ok(socket)
        }) {
        Ok(socket) => socket,
        Err(e) => {
            // A handshake cut short by close() is not a failure; only an
            // unsolicited one gets the error line.
            if !shared.stop.load(Ordering::SeqCst) {
                log_info!("Live session connect failed: {}", e);
                shared.push_line(
                    Role::Error,
                    "UPLINK FAILURE. TACTICAL FEED UNAVAILABLE.",
                    LineKind::Log,
                );
            }
            shared.mark_closed();
            return;
        }
    };

    if shared.stop.load(Ordering::SeqCst) {
        let _ = socket.close(None);
        shared.set_state(SessionState::Closed);
        return;
    }

    shared.set_state(SessionState::Active);
    shared.push_line(
        Role::Analysis,
        "TACTICAL LINK ESTABLISHED. MONITORING BEHAVIORAL PATTERNS...",
        LineKind::Log,
    );
    log_info!("Live session active");

    // cpal streams are not Send, so playback and microphone both belong to
    // this thread for the life of the session.
    let mut scheduler = AudioScheduler::with_device();
    let mic = MicCapture::open();
    if mic.is_none() {
        shared.push_line(
            Role::Analysis,
            "AUDIO INPUT OFFLINE. VISUAL TRACKING ONLY.",
            LineKind::Log,
        );
    }
    let mut last_mic_flush = Instant::now();

    while !shared.stop.load(Ordering::SeqCst) {
        while let Ok(jpeg) = frame_rx.try_recv() {
            if let Err(e) = transport::send_media_chunk(&mut socket, "image/jpeg", &jpeg) {
                eprintln!("[Session] Frame send failed: {}", e);
                shared.mark_closed();
                break;
            }
        }

        if let Some(mic) = &mic {
            if last_mic_flush.elapsed() >= MIC_FLUSH_INTERVAL {
                last_mic_flush = Instant::now();
                let samples = mic.drain();
                if !samples.is_empty() {
                    if let Err(e) = transport::send_audio_chunk(&mut socket, &samples) {
                        eprintln!("[Session] Audio send failed: {}", e);
                        shared.mark_closed();
                        break;
                    }
                }
            }
        }

        match socket.read() {
            Ok(tungstenite::Message::Text(msg)) => {
                for event in transport::parse_server_events(msg.as_str()) {
                    if event == ServerEvent::GoAway {
                        log_info!("Live session: server going away");
                        shared.mark_closed();
                        break;
                    }
                    dispatch_server_event(&shared, &mut scheduler, event);
                }
            }
            Ok(tungstenite::Message::Binary(data)) => {
                if let Ok(msg) = String::from_utf8(data.to_vec()) {
                    for event in transport::parse_server_events(&msg) {
                        dispatch_server_event(&shared, &mut scheduler, event);
                    }
                }
            }
            Ok(tungstenite::Message::Close(_)) => {
                log_info!("Live session: server closed the connection");
                shared.mark_closed();
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                eprintln!("[Session] Socket error: {}", e);
                shared.push_line(Role::Error, "TACTICAL FEED LOST.", LineKind::Log);
                shared.mark_closed();
            }
        }
    }

    let _ = socket.close(None);
    shared.set_state(SessionState::Closed);
}

/// Microphone capture: mono mixdown resampled to the uplink rate, collected
/// into a buffer the session loop drains periodically.
struct MicCapture {
    _stream: cpal::Stream,
    buffer: Arc<Mutex<VecDeque<i16>>>,
}

impl MicCapture {
    fn open() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_input_device()?;
        let config = device.default_input_config().ok()?;
        let sample_rate = config.sample_rate();
        let channels = config.channels() as usize;

        let buffer: Arc<Mutex<VecDeque<i16>>> = Arc::new(Mutex::new(VecDeque::new()));

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let buf = buffer.clone();
                device
                    .build_input_stream(
                        &config.into(),
                        move |data: &[f32], _: &_| {
                            let mono: Vec<i16> = if channels > 1 {
                                data.chunks(channels)
                                    .map(|c| {
                                        ((c.iter().sum::<f32>() / channels as f32)
                                            * i16::MAX as f32)
                                            as i16
                                    })
                                    .collect()
                            } else {
                                data.iter().map(|&f| (f * i16::MAX as f32) as i16).collect()
                            };
                            let resampled = resample_to_16khz(&mono, sample_rate);
                            if let Ok(mut buf) = buf.lock() {
                                buf.extend(resampled);
                            }
                        },
                        |e| eprintln!("[Session] Mic stream error: {}", e),
                        None,
                    )
                    .ok()?
            }
            cpal::SampleFormat::I16 => {
                let buf = buffer.clone();
                device
                    .build_input_stream(
                        &config.into(),
                        move |data: &[i16], _: &_| {
                            let mono: Vec<i16> = if channels > 1 {
                                data.chunks(channels)
                                    .map(|c| {
                                        (c.iter().map(|&s| s as i32).sum::<i32>()
                                            / c.len() as i32)
                                            as i16
                                    })
                                    .collect()
                            } else {
                                data.to_vec()
                            };
                            let resampled = resample_to_16khz(&mono, sample_rate);
                            if let Ok(mut buf) = buf.lock() {
                                buf.extend(resampled);
                            }
                        },
                        |e| eprintln!("[Session] Mic stream error: {}", e),
                        None,
                    )
                    .ok()?
            }
            _ => return None,
        };

        if stream.play().is_err() {
            return None;
        }

        Some(Self {
            _stream: stream,
            buffer,
        })
    }

    fn drain(&self) -> Vec<i16> {
        match self.buffer.lock() {
            Ok(mut buf) => buf.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Nearest-neighbor resample down to the 16 kHz uplink rate.
fn resample_to_16khz(samples: &[i16], source_rate: u32) -> Vec<i16> {
    if source_rate == transport::INPUT_SAMPLE_RATE {
        return samples.to_vec();
    }
    let ratio = transport::INPUT_SAMPLE_RATE as f64 / source_rate as f64;
    let new_len = (samples.len() as f64 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let src_idx = (i as f64 / ratio) as usize;
        if src_idx < samples.len() {
            resampled.push(samples[src_idx]);
        }
    }
    resampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hud::THREAT_INITIAL;
    use crate::live::classify::THREAT_RAISE;
    use crate::live::playback::MonotonicClock;

    fn active_shared() -> SessionShared {
        let shared = SessionShared::new();
        shared.set_state(SessionState::Active);
        shared
    }

    fn scheduler() -> AudioScheduler {
        AudioScheduler::new(Box::new(MonotonicClock::new()), None)
    }

    #[test]
    fn closing_an_unopened_controller_stays_idle() {
        let mut controller = LiveSessionController::new();
        controller.close();
        assert_eq!(controller.state(), SessionState::Idle);
        // Still deployable afterwards.
        assert!(controller.shared().state() == SessionState::Idle);
    }

    #[test]
    fn closing_while_connecting_does_not_wait_for_the_worker() {
        // Stand-in for a worker stuck in a blocking handshake phase.
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let mut controller = LiveSessionController::new();
        controller.shared.set_state(SessionState::Connecting);
        controller.worker = Some(std::thread::spawn(move || {
            let _ = release_rx.recv();
        }));

        let started = Instant::now();
        controller.close();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(controller.state(), SessionState::Closed);
        assert!(controller.shared().stop.load(Ordering::SeqCst));

        release_tx.send(()).unwrap();
    }

    #[test]
    fn closed_session_cannot_reopen() {
        let controller = LiveSessionController::new();
        controller.shared().mark_closed();
        assert_eq!(controller.state(), SessionState::Closed);
    }

    #[test]
    fn output_transcript_feeds_hud_and_threat() {
        let shared = active_shared();
        let mut sched = scheduler();
        dispatch_server_event(
            &shared,
            &mut sched,
            ServerEvent::OutputTranscript("Admin is waving. Possible threat nearby.".to_string()),
        );
        shared.with_hud(|hud| {
            let lines = hud.transcript.lines();
            assert_eq!(lines[0].role, Role::Machine);
            assert_eq!(lines[1].text, "[GESTURE_DETECTED]: WAVE_SIG_01");
            assert_eq!(lines[1].kind, LineKind::Gesture);
            assert_eq!(hud.threat.level(), THREAT_INITIAL + THREAT_RAISE);
        });
    }

    #[test]
    fn events_after_stop_are_discarded() {
        let shared = active_shared();
        shared.stop.store(true, Ordering::SeqCst);
        let mut sched = scheduler();
        dispatch_server_event(
            &shared,
            &mut sched,
            ServerEvent::OutputTranscript("late arrival".to_string()),
        );
        dispatch_server_event(&shared, &mut sched, ServerEvent::Audio(vec![0u8; 480]));
        shared.with_hud(|hud| {
            assert!(hud.transcript.is_empty());
            assert_eq!(hud.threat.level(), THREAT_INITIAL);
        });
        assert_eq!(sched.active_count(), 0);
    }

    #[test]
    fn interruption_flushes_scheduled_audio() {
        let shared = active_shared();
        let mut sched = scheduler();
        dispatch_server_event(&shared, &mut sched, ServerEvent::Audio(vec![0u8; 4800]));
        dispatch_server_event(&shared, &mut sched, ServerEvent::Audio(vec![0u8; 4800]));
        assert_eq!(sched.active_count(), 2);
        dispatch_server_event(&shared, &mut sched, ServerEvent::Interrupted);
        assert_eq!(sched.active_count(), 0);
        assert_eq!(sched.next_start(), 0.0);
    }

    #[test]
    fn frames_are_dropped_when_session_is_not_live() {
        let shared = SessionShared::new();
        let (tx, _rx) = sync_channel::<Vec<u8>>(1);
        assert!(!send_frame(&shared, &tx, vec![1, 2, 3]));
    }

    #[test]
    fn backed_up_uplink_drops_frames_instead_of_queueing() {
        let shared = active_shared();
        let (tx, rx) = sync_channel::<Vec<u8>>(1);
        assert!(send_frame(&shared, &tx, vec![1]));
        // Queue is full; the next frame goes on the floor.
        assert!(!send_frame(&shared, &tx, vec![2]));
        assert_eq!(rx.recv().unwrap(), vec![1]);
        // And delivery resumes once the worker catches up.
        assert!(send_frame(&shared, &tx, vec![3]));
    }

    #[test]
    fn resample_halves_a_32khz_signal() {
        let samples: Vec<i16> = (0..64).collect();
        let out = resample_to_16khz(&samples, 32000);
        assert_eq!(out.len(), 32);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 2);
    }

    #[test]
    fn resample_is_identity_at_target_rate() {
        let samples = vec![5i16, 6, 7];
        assert_eq!(resample_to_16khz(&samples, 16000), samples);
    }
}
