//! Full-state snapshot feeds.
//!
//! A [`Publisher`] pushes whole snapshots (catalog index, profile) to any
//! number of [`Subscription`] handles. Each snapshot carries a generation
//! number so a consumer can tell that a computation it started is already
//! superseded. Dropping a subscription releases it.

use std::sync::Arc;

use tokio::sync::watch;

/// One published state, tagged with its generation.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub generation: u64,
    pub value: Arc<T>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            value: Arc::clone(&self.value),
        }
    }
}

/// Sending side of a snapshot feed.
#[derive(Debug)]
pub struct Publisher<T> {
    tx: watch::Sender<Snapshot<T>>,
    generation: u64,
}

impl<T> Publisher<T> {
    /// Start a feed at generation 0 with `initial` as its state.
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Snapshot {
            generation: 0,
            value: Arc::new(initial),
        });
        Self { tx, generation: 0 }
    }

    /// Replace the current state. Returns the new generation.
    pub fn publish(&mut self, value: T) -> u64 {
        self.publish_shared(Arc::new(value))
    }

    pub fn publish_shared(&mut self, value: Arc<T>) -> u64 {
        self.generation += 1;
        self.tx.send_replace(Snapshot {
            generation: self.generation,
            value,
        });
        self.generation
    }

    pub fn current(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Live subscription handles.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving side of a snapshot feed. Released on drop.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<Snapshot<T>>,
}

impl<T> Subscription<T> {
    /// The newest snapshot, marking it as seen.
    pub fn latest(&mut self) -> Snapshot<T> {
        self.rx.borrow_and_update().clone()
    }

    /// Whether a snapshot newer than the last one seen has arrived.
    pub fn has_update(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Whether a computation started against `generation` is superseded.
    pub fn is_stale(&self, generation: u64) -> bool {
        self.rx.borrow().generation > generation
    }

    /// Wait for the next snapshot. Intermediate snapshots published while
    /// the caller was busy are skipped. Returns `None` once the publisher
    /// is gone.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        self.rx.changed().await.ok()?;
        Some(self.latest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_see_latest_generation() {
        let mut publisher = Publisher::new("a");
        let mut sub = publisher.subscribe();
        assert_eq!(sub.latest().generation, 0);
        assert!(!sub.has_update());

        publisher.publish("b");
        publisher.publish("c");
        assert!(sub.has_update());
        let snap = sub.latest();
        assert_eq!(snap.generation, 2);
        assert_eq!(*snap.value, "c");
        assert!(!sub.has_update());
    }

    #[test]
    fn stale_detection_follows_generation() {
        let mut publisher = Publisher::new(1u32);
        let mut sub = publisher.subscribe();
        let started = sub.latest().generation;
        assert!(!sub.is_stale(started));
        publisher.publish(2);
        assert!(sub.is_stale(started));
    }

    #[test]
    fn dropping_subscription_releases_it() {
        let publisher = Publisher::new(());
        let a = publisher.subscribe();
        let b = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 2);
        drop(a);
        assert_eq!(publisher.subscriber_count(), 1);
        drop(b);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn publish_without_subscribers_still_updates_state() {
        let mut publisher = Publisher::new(0u8);
        publisher.publish(7);
        assert_eq!(*publisher.current().value, 7);
        assert_eq!(publisher.generation(), 1);
    }

    #[tokio::test]
    async fn next_waits_for_publish_and_ends_with_publisher() {
        let mut publisher = Publisher::new(0u32);
        let mut sub = publisher.subscribe();

        let handle = tokio::spawn(async move {
            let first = sub.next().await.map(|s| *s.value);
            let end = sub.next().await.map(|s| *s.value);
            (first, end)
        });

        tokio::task::yield_now().await;
        publisher.publish(5);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(publisher);

        let (first, end) = handle.await.unwrap();
        assert_eq!(first, Some(5));
        assert_eq!(end, None);
    }
}
