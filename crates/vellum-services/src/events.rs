use tokio::sync::broadcast;
use vellum_core::{MediaEvent, MediaEventPublisher};

/// Publishes media events to any number of in-process subscribers.
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded; publishing
/// never blocks and never fails.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<MediaEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.sender.subscribe()
    }
}

impl MediaEventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: MediaEvent) {
        tracing::debug!(
            event = event.name(),
            media_id = %event.media().id,
            "Publishing media event"
        );
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}
