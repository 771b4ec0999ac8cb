//! Fire-and-forget side channels: user-facing notifications and the
//! immediate-sync trigger.
//!
//! Both seams are consumed, never awaited: the engine reports pass status
//! through [`Notifier`], recording flows nudge the external scheduler
//! through [`SyncTrigger`]. Neither return value feeds back into the core.

use tokio::sync::mpsc;

/// Status reporting seam. Display is someone else's job.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str, is_error: bool);
}

/// Default notifier that writes to the log stream.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str, is_error: bool) {
        if is_error {
            tracing::error!(title = %title, "{}", body);
        } else {
            tracing::info!(title = %title, "{}", body);
        }
    }
}

/// Request for an immediate sync pass, delivered to the external scheduler.
pub trait SyncTrigger: Send + Sync {
    fn request(&self);
}

/// Trigger that does nothing; for flows running without a scheduler.
pub struct NoopTrigger;

impl SyncTrigger for NoopTrigger {
    fn request(&self) {}
}

/// Channel-backed trigger; the scheduler drains the receiver and runs a pass
/// per message (coalescing as it sees fit).
pub struct ChannelTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl ChannelTrigger {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SyncTrigger for ChannelTrigger {
    fn request(&self) {
        // A gone scheduler just means nobody is listening anymore.
        let _ = self.tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_trigger_delivers_requests() {
        let (trigger, mut rx) = ChannelTrigger::new();

        trigger.request();
        trigger.request();

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn noop_trigger_is_silent() {
        NoopTrigger.request();
    }
}
