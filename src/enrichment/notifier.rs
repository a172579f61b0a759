use super::models::MetadataChange;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of [`MetadataChange`] events to any number of subscribers.
///
/// Sending never blocks; a subscriber that falls behind by more than the channel
/// capacity sees `RecvError::Lagged` and should refresh everything.
#[derive(Clone)]
pub struct MetadataChangeNotifier {
    tx: broadcast::Sender<MetadataChange>,
}

impl MetadataChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetadataChange> {
        self.tx.subscribe()
    }

    pub fn notify(&self, change: MetadataChange) {
        if self.tx.send(change).is_err() {
            debug!("Metadata change dropped, no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MetadataChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_receives_changes() {
        let notifier = MetadataChangeNotifier::new();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.notify(MetadataChange::ArtistGenres { artist_id: 7 });

        assert_eq!(a.try_recv().unwrap(), MetadataChange::ArtistGenres { artist_id: 7 });
        assert_eq!(b.try_recv().unwrap(), MetadataChange::ArtistGenres { artist_id: 7 });
    }

    #[test]
    fn test_notify_without_subscribers_is_harmless() {
        MetadataChangeNotifier::new().notify(MetadataChange::ArtistGenres { artist_id: 1 });
    }
}
