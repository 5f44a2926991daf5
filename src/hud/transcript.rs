//! Append-only behavioral log, trimmed to a bounded recent window.

/// Who produced a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Machine,
    Analysis,
    Error,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Machine => "MACHINE",
            Role::Analysis => "ANALYSIS",
            Role::Error => "ERROR",
        }
    }
}

/// Category tag controlling how a line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Chat,
    Gesture,
    Log,
}

#[derive(Debug, Clone)]
pub struct TranscriptLine {
    pub role: Role,
    pub text: String,
    pub kind: LineKind,
}

/// Lines kept visible before each append.
const RECENT_WINDOW: usize = 20;

pub struct TranscriptLog {
    lines: Vec<TranscriptLine>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Trim to the most recent window, then append.
    pub fn push(&mut self, role: Role, text: String, kind: LineKind) {
        if self.lines.len() > RECENT_WINDOW {
            let excess = self.lines.len() - RECENT_WINDOW;
            self.lines.drain(..excess);
        }
        self.lines.push(TranscriptLine { role, text, kind });
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for TranscriptLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_in_order() {
        let mut log = TranscriptLog::new();
        log.push(Role::Admin, "one".into(), LineKind::Chat);
        log.push(Role::Machine, "two".into(), LineKind::Chat);
        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "one");
        assert_eq!(lines[1].text, "two");
        assert_eq!(lines[1].role, Role::Machine);
    }

    #[test]
    fn log_is_bounded_to_recent_window() {
        let mut log = TranscriptLog::new();
        for i in 0..100 {
            log.push(Role::Analysis, format!("line {}", i), LineKind::Log);
        }
        assert!(log.lines().len() <= RECENT_WINDOW + 1);
        // Oldest surviving line is recent, newest is the last pushed.
        assert_eq!(log.lines().last().unwrap().text, "line 99");
        assert!(log.lines()[0].text.as_str() >= "line 7");
    }
}
