//! Progress reporting towards the rendering collaborator.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Receives progress while a load runs. Called zero or more times per load.
///
/// `percent` is in `0.0..=100.0`. Implementations must not block; the loader
/// calls them inline between resource loads.
pub trait ProgressSink: Send + Sync {
    /// Report that `stage` advanced overall progress to `percent`.
    fn report_progress(&self, stage: &str, percent: f32, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, f32, &str) + Send + Sync,
{
    fn report_progress(&self, stage: &str, percent: f32, message: &str) {
        self(stage, percent, message);
    }
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report_progress(&self, _stage: &str, _percent: f32, _message: &str) {}
}

/// Owned copy of one progress report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Stage label, usually the resource kind.
    pub stage: String,
    /// Overall completion in `0.0..=100.0`.
    pub percent: f32,
    /// Human-readable status line.
    pub message: String,
}

/// Forwards reports over an unbounded channel, e.g. to a UI task.
///
/// Reports sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create a sink and the receiver that observes it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn report_progress(&self, stage: &str, percent: f32, message: &str) {
        let _ = self.tx.send(ProgressEvent {
            stage: stage.to_string(),
            percent,
            message: message.to_string(),
        });
    }
}
