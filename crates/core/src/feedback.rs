//! Progress and cancellation channel for long-running operations.
//!
//! Algorithms report progress as a percentage in `[0, 100]` and poll for
//! cancellation between units of work. Frontends decide what to do with
//! both (progress bar, log line, nothing).

/// Sink for progress reports and source of cancellation requests.
pub trait Feedback {
    /// Report overall progress, in percent.
    fn set_progress(&mut self, percent: f64);

    /// Whether the caller asked to stop. Checked between units of work;
    /// a canceled run stops at the next check.
    fn is_canceled(&self) -> bool {
        false
    }

    /// Informational message for the frontend.
    fn push_info(&mut self, _message: &str) {}
}

/// Feedback sink that discards everything. For non-interactive callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFeedback;

impl Feedback for NullFeedback {
    fn set_progress(&mut self, _percent: f64) {}
}
