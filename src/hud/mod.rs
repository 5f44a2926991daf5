//! Per-screen presentation state machines: transcript log, threat gauge,
//! typewriter reveal and synthetic target tracking. All of these are plain
//! reducers driven by session events; rendering lives in `gui`.

mod threat;
mod tracking;
mod transcript;
mod typewriter;

pub use threat::{ThreatGauge, TARGET_LOCK_STEP, THREAT_INITIAL, THREAT_MAX, THREAT_MIN};
pub use tracking::{regenerate_tracked_items, SignalColor, TrackedItem, TRACK_TICK};
pub use transcript::{LineKind, Role, TranscriptLine, TranscriptLog};
pub use typewriter::Typewriter;

/// Surveillance-screen state mutated by live session events.
pub struct SurveillanceHud {
    pub transcript: TranscriptLog,
    pub threat: ThreatGauge,
}

impl SurveillanceHud {
    pub fn new() -> Self {
        Self {
            transcript: TranscriptLog::new(),
            threat: ThreatGauge::new(),
        }
    }
}

impl Default for SurveillanceHud {
    fn default() -> Self {
        Self::new()
    }
}
