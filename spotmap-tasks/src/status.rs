//! Status line sinks driven by the orchestrator.

use std::sync::mpsc::Sender;

/// Receives user-facing status updates.
///
/// Called from supervisor threads; implementations must not block for long.
pub trait StatusSink: Send + Sync {
    /// Replaces the status line. An empty string clears it.
    fn set_status(&self, text: &str);

    /// Shows an error.
    fn set_error(&self, text: &str);

    /// A task was cancelled; `active_tasks` are still running.
    fn on_cancel(&self, active_tasks: usize) {
        let _ = active_tasks;
    }
}

/// Writes status updates to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn set_status(&self, text: &str) {
        if !text.is_empty() {
            log::info!("{text}");
        }
    }

    fn set_error(&self, text: &str) {
        log::error!("{text}");
    }

    fn on_cancel(&self, active_tasks: usize) {
        log::debug!("task cancelled, {active_tasks} still active");
    }
}

/// Status update forwarded by [`ChannelStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Status(String),
    Error(String),
    Cancelled { active_tasks: usize },
}

/// Forwards status updates to another thread, typically a UI event loop.
#[derive(Debug, Clone)]
pub struct ChannelStatus {
    tx: Sender<StatusEvent>,
}

impl ChannelStatus {
    #[must_use]
    pub fn new(tx: Sender<StatusEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: StatusEvent) {
        // The receiving side may already be gone during shutdown.
        let _ = self.tx.send(event);
    }
}

impl StatusSink for ChannelStatus {
    fn set_status(&self, text: &str) {
        self.send(StatusEvent::Status(text.to_string()));
    }

    fn set_error(&self, text: &str) {
        self.send(StatusEvent::Error(text.to_string()));
    }

    fn on_cancel(&self, active_tasks: usize) {
        self.send(StatusEvent::Cancelled { active_tasks });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_channel_status_forwards() {
        let (tx, rx) = mpsc::channel();
        let sink = ChannelStatus::new(tx);
        sink.set_status("working");
        sink.set_error("boom");
        sink.on_cancel(2);
        drop(sink);
        let events: Vec<_> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                StatusEvent::Status("working".into()),
                StatusEvent::Error("boom".into()),
                StatusEvent::Cancelled { active_tasks: 2 },
            ]
        );
    }

    #[test]
    fn test_channel_status_survives_closed_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        ChannelStatus::new(tx).set_status("nobody listens");
    }
}
