//! Timer-based coalescing window for the store's disk flushes.

use tokio::time::{Duration, Instant, sleep_until};

/// Tracks a sliding deadline. Every `touch` pushes the deadline out by the
/// window; `expired` resolves once the deadline passes, or never while no
/// deadline is armed.
#[derive(Debug)]
pub struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arm (or re-arm) the window starting now.
    pub fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    #[must_use]
    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn clear(&mut self) {
        self.deadline = None;
    }

    /// Wait for the armed deadline. Pends forever when nothing is armed, so
    /// this is only safe inside `select!` alongside other branches.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
