//! Keyword heuristics over model transcript text.
//!
//! The live model narrates what it sees in free-form prose; gesture, motion
//! and threat signals are derived by substring matching. All of that fragility
//! is isolated behind one pure function so a structured event contract can
//! replace it without touching the session controller.

/// Signals derived from one output-transcript fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub gesture: bool,
    pub motion: bool,
    /// Positive raises the threat gauge, negative lowers it, zero leaves it.
    pub threat_delta: i32,
}

pub const THREAT_RAISE: i32 = 15;
pub const THREAT_LOWER: i32 = 10;

const GESTURE_KEYWORDS: &[&str] = &["waving", "wave"];
const MOTION_KEYWORDS: &[&str] = &["moving", "motion"];
const THREAT_KEYWORDS: &[&str] = &["threat", "danger"];
const SAFE_KEYWORDS: &[&str] = &["safe", "clear"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Scan one transcript fragment for the fixed keyword families.
/// Matching is case-insensitive; threat keywords win over safe keywords.
pub fn classify(text: &str) -> Classification {
    let lower = text.to_lowercase();
    let threat_delta = if contains_any(&lower, THREAT_KEYWORDS) {
        THREAT_RAISE
    } else if contains_any(&lower, SAFE_KEYWORDS) {
        -THREAT_LOWER
    } else {
        0
    };
    Classification {
        gesture: contains_any(&lower, GESTURE_KEYWORDS),
        motion: contains_any(&lower, MOTION_KEYWORDS),
        threat_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_is_a_gesture() {
        let c = classify("I see you waving, Admin.");
        assert!(c.gesture);
        assert!(!c.motion);
        assert_eq!(c.threat_delta, 0);
    }

    #[test]
    fn motion_is_tracked() {
        let c = classify("Subject is MOVING toward the exit.");
        assert!(c.motion);
        assert!(!c.gesture);
    }

    #[test]
    fn threat_keywords_raise_and_win_over_safe() {
        assert_eq!(classify("Possible threat detected.").threat_delta, THREAT_RAISE);
        assert_eq!(classify("DANGER in sector four.").threat_delta, THREAT_RAISE);
        // A fragment containing both families resolves toward threat.
        assert_eq!(classify("threat neutralized, all clear").threat_delta, THREAT_RAISE);
    }

    #[test]
    fn safe_keywords_lower() {
        assert_eq!(classify("Perimeter is clear.").threat_delta, -THREAT_LOWER);
        assert_eq!(classify("You are safe.").threat_delta, -THREAT_LOWER);
    }

    #[test]
    fn neutral_text_is_neutral() {
        assert_eq!(classify("Monitoring continues."), Classification::default());
    }
}
