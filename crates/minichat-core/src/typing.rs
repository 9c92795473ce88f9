/// Composer-activity flag that suppresses background refresh while the user types.
///
/// Time is passed in as monotonic milliseconds so the idle deadline is evaluated
/// lazily at the moment a poll tick asks, not when the tick was scheduled.
#[derive(Debug, Clone)]
pub struct TypingGate {
    idle_timeout_ms: u64,
    deadline_ms: Option<u64>,
}

impl TypingGate {
    pub fn new(idle_timeout_ms: u64) -> Self {
        Self {
            idle_timeout_ms,
            deadline_ms: None,
        }
    }

    /// Record a composer change; non-empty text (re)starts the idle deadline.
    pub fn on_input(&mut self, text: &str, now_ms: u64) {
        self.deadline_ms = if text.is_empty() {
            None
        } else {
            Some(now_ms.saturating_add(self.idle_timeout_ms))
        };
    }

    /// Clear immediately (message sent).
    pub fn clear(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_typing(&self, now_ms: u64) -> bool {
        self.deadline_ms.is_some_and(|deadline| now_ms < deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_set_until_idle_timeout_elapses() {
        let mut gate = TypingGate::new(1_000);
        gate.on_input("h", 0);
        assert!(gate.is_typing(999));
        assert!(!gate.is_typing(1_000));
    }

    #[test]
    fn each_keystroke_restarts_the_deadline() {
        let mut gate = TypingGate::new(1_000);
        gate.on_input("h", 0);
        gate.on_input("hi", 800);
        assert!(gate.is_typing(1_500));
        assert!(!gate.is_typing(1_800));
    }

    #[test]
    fn empty_text_and_send_clear_immediately() {
        let mut gate = TypingGate::new(1_000);
        gate.on_input("draft", 10);
        gate.on_input("", 20);
        assert!(!gate.is_typing(21));

        gate.on_input("again", 30);
        gate.clear();
        assert!(!gate.is_typing(31));
    }
}
