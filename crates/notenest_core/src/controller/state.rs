//! Editor dirty-tracking state and the debounce timer handle.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Autosave state machine.
///
/// `Clean -> Dirty` on input, `Dirty -> Saving` when the debounce fires,
/// `Saving -> Clean` when that persist completes. Input while `Saving`
/// returns to `Dirty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Clean,
    Dirty,
    Saving,
}

/// Status indicator shown next to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saving,
    Saved,
    /// Last persist failed; the next save retries with the full tree.
    Unsaved,
}

/// Live editor contents, possibly ahead of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorBuffer {
    pub title: String,
    pub content: String,
}

/// Single cancel-and-reschedule timer.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Restarts the quiet period from now.
    pub fn reschedule(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
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

    /// Resolves at the deadline; never resolves while cancelled.
    pub async fn fired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebounceTimer;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn reschedule_moves_deadline_forward() {
        let mut timer = DebounceTimer::new(Duration::from_millis(500));
        assert!(!timer.is_pending());

        timer.reschedule();
        let first = timer.deadline().expect("deadline set");
        tokio::time::advance(Duration::from_millis(200)).await;
        timer.reschedule();
        let second = timer.deadline().expect("deadline set");
        assert_eq!(second - first, Duration::from_millis(200));

        let started = Instant::now();
        timer.fired().await;
        assert_eq!(Instant::now() - started, Duration::from_millis(500));

        timer.cancel();
        assert!(timer.deadline().is_none());
    }
}
