// Autosave debouncer.
//
// Each edit pushes the deadline out by one window; the save fires once the
// document has been quiet for the whole window. Window default 1500ms,
// clamped to 250–10000ms.

use std::time::Duration;

use tokio::time::Instant;

const DEFAULT_DEBOUNCE_MS: u64 = 1_500;
const MIN_DEBOUNCE_MS: u64 = 250;
const MAX_DEBOUNCE_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    pub window: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self { window: Duration::from_millis(DEFAULT_DEBOUNCE_MS) }
    }
}

impl DebounceConfig {
    /// Window in milliseconds, clamped to [250, 10000].
    pub fn with_millis(ms: u64) -> Self {
        let clamped = ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS);
        Self { window: Duration::from_millis(clamped) }
    }
}

#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    config: DebounceConfig,
    deadline: Option<Instant>,
}

impl AutosaveTimer {
    pub fn new(config: DebounceConfig) -> Self {
        Self { config, deadline: None }
    }

    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// (Re)start the timer from now.
    pub fn schedule(&mut self) {
        self.schedule_at(Instant::now());
    }

    fn schedule_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.config.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the timer if it has expired.
    pub fn take_due(&mut self) -> bool {
        self.take_due_at(Instant::now())
    }

    fn take_due_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
