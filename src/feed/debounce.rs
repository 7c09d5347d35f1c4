use std::time::Duration;

use tokio::time::Instant;

/// Coalesces rapid search keystrokes into one committed value.
///
/// Every `input` restarts the quiet period; `poll` hands out the latest text
/// once the period has elapsed, exactly once.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Option<String>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
        }
    }

    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some(text.into());
        self.deadline = Some(now + self.window);
    }

    /// When the pending value becomes due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the pending value if its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Drops any pending value without firing it.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline = None;
    }
}
