//! Synthetic target-tracking overlay. Items are fully recomputed on every
//! tick while a session is active; nothing here persists.

use std::time::Duration;

use rand::Rng;

/// Regeneration cadence while a session is live.
pub const TRACK_TICK: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalColor {
    White,
    Yellow,
    Red,
}

/// One overlay annotation, positioned in percent of the viewport.
#[derive(Debug, Clone)]
pub struct TrackedItem {
    pub id: &'static str,
    pub label: String,
    pub color: SignalColor,
    pub top: f32,
    pub left: f32,
    pub w: f32,
    pub h: f32,
}

/// Recompute the overlay set for the current threat level. The admin box is
/// always present with a small positional jitter; a second signature shows
/// up under elevated threat or at random.
pub fn regenerate_tracked_items<R: Rng>(threat_level: i32, rng: &mut R) -> Vec<TrackedItem> {
    let admin_color = if threat_level > 70 {
        SignalColor::Red
    } else if threat_level > 30 {
        SignalColor::Yellow
    } else {
        SignalColor::White
    };

    let mut items = vec![TrackedItem {
        id: "admin",
        label: "ASSET: ADMIN".to_string(),
        color: admin_color,
        top: 25.0 + rng.gen_range(-1.0..=1.0),
        left: 35.0 + rng.gen_range(-1.0..=1.0),
        w: 30.0,
        h: 40.0,
    }];

    if threat_level > 40 || rng.gen::<f32>() > 0.7 {
        let hostile = threat_level > 60;
        items.push(TrackedItem {
            id: "sig-2",
            label: if hostile {
                "THREAT: DETECTED".to_string()
            } else {
                "IDENT: UNKNOWN".to_string()
            },
            color: if hostile {
                SignalColor::Red
            } else {
                SignalColor::Yellow
            },
            top: 10.0 + rng.gen::<f32>() * 50.0,
            left: 60.0 + rng.gen::<f32>() * 20.0,
            w: 15.0,
            h: 20.0,
        });
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn admin_box_is_always_tracked() {
        let mut rng = StdRng::seed_from_u64(7);
        for threat in [5, 12, 50, 100] {
            let items = regenerate_tracked_items(threat, &mut rng);
            assert_eq!(items[0].id, "admin");
            assert!((24.0..=26.0).contains(&items[0].top));
            assert!((34.0..=36.0).contains(&items[0].left));
        }
    }

    #[test]
    fn elevated_threat_forces_a_hostile_signature() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = regenerate_tracked_items(80, &mut rng);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].color, SignalColor::Red);
        assert_eq!(items[1].label, "THREAT: DETECTED");
        assert_eq!(items[1].color, SignalColor::Red);
    }

    #[test]
    fn mid_threat_signature_is_unidentified() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = regenerate_tracked_items(45, &mut rng);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].label, "IDENT: UNKNOWN");
        assert_eq!(items[1].color, SignalColor::Yellow);
    }
}
