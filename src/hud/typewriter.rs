//! Letter-by-letter text reveal on a fixed interval.

use std::time::{Duration, Instant};

pub struct Typewriter {
    text: String,
    /// Revealed cursor, counted in chars.
    revealed: usize,
    interval: Duration,
    last_tick: Instant,
}

impl Typewriter {
    pub fn new(interval: Duration) -> Self {
        Self {
            text: String::new(),
            revealed: 0,
            interval,
            last_tick: Instant::now(),
        }
    }

    /// Swap in new source text. A changed text cancels the in-flight reveal
    /// and restarts from the beginning; identical text is left alone.
    pub fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
            self.revealed = 0;
            self.last_tick = Instant::now();
        }
    }

    /// Advance the cursor by however many intervals have elapsed.
    pub fn tick(&mut self) {
        if self.done() {
            return;
        }
        let interval_ms = self.interval.as_millis().max(1) as u64;
        let steps = (self.last_tick.elapsed().as_millis() as u64 / interval_ms) as usize;
        if steps > 0 {
            self.advance(steps);
            self.last_tick = Instant::now();
        }
    }

    fn advance(&mut self, steps: usize) {
        let total = self.text.chars().count();
        self.revealed = (self.revealed + steps).min(total);
    }

    /// The revealed-so-far prefix, always on a char boundary.
    pub fn visible(&self) -> &str {
        match self.text.char_indices().nth(self.revealed) {
            Some((byte_idx, _)) => &self.text[..byte_idx],
            None => &self.text,
        }
    }

    pub fn done(&self) -> bool {
        self.revealed >= self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer(text: &str) -> Typewriter {
        let mut t = Typewriter::new(Duration::from_millis(10));
        t.set_text(text);
        t
    }

    #[test]
    fn reveal_starts_empty_and_advances() {
        let mut t = writer("SYSTEM ONLINE");
        assert_eq!(t.visible(), "");
        t.advance(6);
        assert_eq!(t.visible(), "SYSTEM");
        t.advance(100);
        assert_eq!(t.visible(), "SYSTEM ONLINE");
        assert!(t.done());
    }

    #[test]
    fn changing_text_restarts_the_reveal() {
        let mut t = writer("first");
        t.advance(5);
        assert!(t.done());
        t.set_text("second");
        assert_eq!(t.visible(), "");
        assert!(!t.done());
    }

    #[test]
    fn identical_text_does_not_restart() {
        let mut t = writer("stable");
        t.advance(3);
        t.set_text("stable");
        assert_eq!(t.visible(), "sta");
    }

    #[test]
    fn multibyte_text_stays_on_char_boundaries() {
        let mut t = writer("đã giám sát");
        t.advance(2);
        assert_eq!(t.visible(), "đã");
    }
}
