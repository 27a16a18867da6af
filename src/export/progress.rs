use serde::Serialize;
use tokio::sync::broadcast;

/// One progress notification, emitted per produced video frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub frames_completed: u64,
    pub total_frames: u64,
    /// `frames_completed / total_frames` in `[0, 1]`; 1 for an empty export.
    pub progress: f64,
}

impl ProgressEvent {
    pub fn new(frames_completed: u64, total_frames: u64) -> Self {
        let progress = if total_frames == 0 {
            1.0
        } else {
            (frames_completed as f64 / total_frames as f64).clamp(0.0, 1.0)
        };
        Self {
            frames_completed,
            total_frames,
            progress,
        }
    }

    pub fn is_final(&self) -> bool {
        self.frames_completed >= self.total_frames
    }
}

/// Bounded one-to-many progress channel.
///
/// Emission never blocks and never fails: with no subscribers events are dropped, and slow
/// subscribers observe `RecvError::Lagged` instead of stalling the export.
#[derive(Clone, Debug)]
pub struct ProgressEmitter {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressEmitter {
    /// New emitter together with its first subscriber.
    pub fn channel(capacity: usize) -> (Self, broadcast::Receiver<ProgressEvent>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, frames_completed: u64, total_frames: u64) {
        let _ = self
            .tx
            .send(ProgressEvent::new(frames_completed, total_frames));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/progress.rs"]
mod tests;
