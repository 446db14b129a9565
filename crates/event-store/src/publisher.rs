//! In-order, at-least-once publication of appended events.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::{AggregateId, EventEnvelope, Version};

/// Error type returned by subscribers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An event was durably appended but could not be applied by a subscriber.
///
/// The append is never rolled back. The subscriber is told about the failure
/// and is expected to mark its derived state as stale.
#[derive(Debug, Clone, Error)]
#[error(
    "subscriber {subscriber} failed to handle {event_type} v{version} of {aggregate_id}: {reason}"
)]
pub struct PublicationFailure {
    pub subscriber: String,
    pub aggregate_id: AggregateId,
    pub event_type: String,
    pub version: Version,
    pub reason: String,
}

impl PublicationFailure {
    fn new(subscriber: &str, event: &EventEnvelope, reason: impl Into<String>) -> Self {
        Self {
            subscriber: subscriber.to_string(),
            aggregate_id: event.aggregate_id.clone(),
            event_type: event.event_type.clone(),
            version: event.version,
            reason: reason.into(),
        }
    }
}

/// A consumer of published events, typically a projection.
///
/// Events of one aggregate arrive in strict version order. Delivery is
/// at-least-once, so `on_event` must tolerate redelivery.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Handles one event.
    async fn on_event(&self, event: &EventEnvelope) -> Result<(), BoxError>;

    /// Called when an event could not be delivered or handled.
    async fn on_publication_failure(&self, failure: &PublicationFailure);

    /// Called once every event of a batch went through `on_event`.
    async fn on_batch_end(&self) {}
}

#[derive(Clone)]
struct Batch {
    sequence: u64,
    events: Arc<[EventEnvelope]>,
}

struct Subscription {
    subscriber: Arc<dyn EventSubscriber>,
    sender: mpsc::UnboundedSender<Batch>,
    delivered: watch::Receiver<u64>,
}

#[derive(Default)]
struct PublisherState {
    last_sequence: u64,
    subscriptions: Vec<Subscription>,
}

/// Fans appended event batches out to subscribers.
///
/// Each subscriber gets its own delivery task fed by an unbounded queue, so
/// a slow or failing subscriber never holds up the append path or the other
/// subscribers. Batches are enqueued under one lock, which keeps every
/// subscriber's view in publish order.
#[derive(Clone, Default)]
pub struct EventPublisher {
    state: Arc<Mutex<PublisherState>>,
}

impl EventPublisher {
    /// Creates a publisher without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PublisherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a subscriber for every batch published from now on.
    ///
    /// Spawns the subscriber's delivery task, so this must be called from
    /// within a Tokio runtime.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        let mut state = self.lock();
        let (sender, receiver) = mpsc::unbounded_channel();
        let (delivered_tx, delivered_rx) = watch::channel(state.last_sequence);

        tokio::spawn(deliver(Arc::clone(&subscriber), receiver, delivered_tx));
        tracing::debug!(subscriber = subscriber.name(), "subscriber registered");

        state.subscriptions.push(Subscription {
            subscriber,
            sender,
            delivered: delivered_rx,
        });
    }

    /// Removes the subscriber registered under `name`.
    ///
    /// Its delivery task finishes the batches already queued and then ends.
    /// Returns whether a subscriber was removed.
    pub fn unsubscribe(&self, name: &str) -> bool {
        let mut state = self.lock();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| s.subscriber.name() != name);
        let removed = state.subscriptions.len() < before;
        if removed {
            tracing::debug!(subscriber = name, "subscriber removed");
        }
        removed
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    /// Enqueues a freshly appended batch for every subscriber.
    ///
    /// Only the event store calls this, right after the batch became
    /// visible. It never awaits, so it cannot be cancelled half way.
    pub fn publish(&self, aggregate_id: &AggregateId, events: &[EventEnvelope]) {
        if events.is_empty() {
            return;
        }

        let mut state = self.lock();
        state.last_sequence += 1;
        let batch = Batch {
            sequence: state.last_sequence,
            events: Arc::from(events.to_vec()),
        };

        for subscription in &state.subscriptions {
            if subscription.sender.send(batch.clone()).is_ok() {
                continue;
            }

            let subscriber = Arc::clone(&subscription.subscriber);
            let failures: Vec<_> = events
                .iter()
                .map(|event| {
                    PublicationFailure::new(
                        subscriber.name(),
                        event,
                        "delivery task is no longer running",
                    )
                })
                .collect();
            tracing::error!(
                subscriber = subscriber.name(),
                %aggregate_id,
                events = failures.len(),
                "events could not be delivered"
            );
            metrics::counter!("publisher_delivery_failures").increment(failures.len() as u64);

            tokio::spawn(async move {
                for failure in &failures {
                    subscriber.on_publication_failure(failure).await;
                }
            });
        }

        tracing::debug!(
            %aggregate_id,
            sequence = batch.sequence,
            events = events.len(),
            "batch published"
        );
    }

    /// Waits until every subscriber has handled every batch published
    /// before this call.
    ///
    /// Returns the names of subscribers whose delivery task stopped before
    /// reaching that point; their undelivered events were reported to them
    /// as publication failures.
    pub async fn settled(&self) -> Vec<String> {
        let (target, receivers): (u64, Vec<_>) = {
            let state = self.lock();
            (
                state.last_sequence,
                state
                    .subscriptions
                    .iter()
                    .map(|s| (s.subscriber.name().to_string(), s.delivered.clone()))
                    .collect(),
            )
        };

        let mut stopped = Vec::new();
        for (name, mut receiver) in receivers {
            if receiver.wait_for(|sequence| *sequence >= target).await.is_err() {
                tracing::error!(subscriber = %name, "delivery task stopped before settling");
                stopped.push(name);
            }
        }
        stopped
    }
}

async fn deliver(
    subscriber: Arc<dyn EventSubscriber>,
    mut batches: mpsc::UnboundedReceiver<Batch>,
    delivered: watch::Sender<u64>,
) {
    while let Some(batch) = batches.recv().await {
        for event in batch.events.iter() {
            let reason = match AssertUnwindSafe(subscriber.on_event(event))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error.to_string(),
                Err(panic) => format!("subscriber panicked: {}", panic_message(&*panic)),
            };

            let failure = PublicationFailure::new(subscriber.name(), event, reason);
            tracing::warn!(%failure, "event delivery failed");
            metrics::counter!("publisher_delivery_failures").increment(1);
            if AssertUnwindSafe(subscriber.on_publication_failure(&failure))
                .catch_unwind()
                .await
                .is_err()
            {
                tracing::error!(subscriber = subscriber.name(), "failure handler panicked");
            }
        }

        if AssertUnwindSafe(subscriber.on_batch_end())
            .catch_unwind()
            .await
            .is_err()
        {
            tracing::error!(subscriber = subscriber.name(), "batch handler panicked");
        }
        delivered.send_replace(batch.sequence);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records what it receives; fails or panics on events of a chosen type.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, u64)>>,
        failures: Mutex<Vec<PublicationFailure>>,
        batches: AtomicUsize,
        fail_on: Option<&'static str>,
        panic_on: Option<&'static str>,
    }

    #[async_trait]
    impl EventSubscriber for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn on_event(&self, event: &EventEnvelope) -> Result<(), BoxError> {
            if self.fail_on == Some(event.event_type.as_str()) {
                return Err("boom".into());
            }
            if self.panic_on == Some(event.event_type.as_str()) {
                panic!("cannot handle {}", event.event_type);
            }
            self.seen
                .lock()
                .unwrap()
                .push((event.aggregate_id.to_string(), event.version.as_u64()));
            Ok(())
        }

        async fn on_publication_failure(&self, failure: &PublicationFailure) {
            self.failures.lock().unwrap().push(failure.clone());
        }

        async fn on_batch_end(&self) {
            self.batches.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn events(
        id: &str,
        versions: std::ops::RangeInclusive<u64>,
        event_type: &str,
    ) -> Vec<EventEnvelope> {
        versions
            .map(|v| {
                EventEnvelope::builder()
                    .aggregate_id(AggregateId::new(id))
                    .aggregate_type("Book")
                    .event_type(event_type)
                    .version(Version::new(v))
                    .payload_raw(serde_json::json!({}))
                    .build()
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn delivers_batches_in_publish_order() {
        let publisher = EventPublisher::new();
        let recorder = Arc::new(Recorder::default());
        publisher.subscribe(recorder.clone());

        let b1 = AggregateId::new("B-1");
        let b2 = AggregateId::new("B-2");
        publisher.publish(&b1, &events("B-1", 1..=2, "BookCreated"));
        publisher.publish(&b2, &events("B-2", 1..=1, "BookCreated"));
        publisher.publish(&b1, &events("B-1", 3..=3, "BookPriceUpdated"));
        publisher.settled().await;

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("B-1".to_string(), 1),
                ("B-1".to_string(), 2),
                ("B-2".to_string(), 1),
                ("B-1".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_affect_others() {
        let publisher = EventPublisher::new();
        let healthy = Arc::new(Recorder::default());
        let failing = Arc::new(Recorder {
            fail_on: Some("BookPriceUpdated"),
            ..Recorder::default()
        });
        publisher.subscribe(healthy.clone());
        publisher.subscribe(failing.clone());

        let b1 = AggregateId::new("B-1");
        publisher.publish(&b1, &events("B-1", 1..=1, "BookCreated"));
        publisher.publish(&b1, &events("B-1", 2..=2, "BookPriceUpdated"));
        publisher.publish(&b1, &events("B-1", 3..=3, "BookCreated"));
        publisher.settled().await;

        assert_eq!(healthy.seen.lock().unwrap().len(), 3);
        assert_eq!(failing.seen.lock().unwrap().len(), 2);

        let failures = failing.failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].version, Version::new(2));
        assert_eq!(failures[0].event_type, "BookPriceUpdated");
    }

    #[tokio::test]
    async fn panicking_subscriber_keeps_receiving_events() {
        let publisher = EventPublisher::new();
        let healthy = Arc::new(Recorder::default());
        let panicking = Arc::new(Recorder {
            panic_on: Some("BookCreated"),
            ..Recorder::default()
        });
        publisher.subscribe(healthy.clone());
        publisher.subscribe(panicking.clone());

        let b1 = AggregateId::new("B-1");
        publisher.publish(&b1, &events("B-1", 1..=1, "BookCreated"));
        publisher.publish(&b1, &events("B-1", 2..=3, "BookPriceUpdated"));
        let stopped = publisher.settled().await;

        assert!(stopped.is_empty());
        assert_eq!(healthy.seen.lock().unwrap().len(), 3);
        assert_eq!(
            panicking.seen.lock().unwrap().clone(),
            vec![("B-1".to_string(), 2), ("B-1".to_string(), 3)]
        );

        let failures = panicking.failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].version, Version::first());
        assert!(failures[0].reason.contains("cannot handle BookCreated"));
    }

    #[tokio::test]
    async fn batch_end_follows_every_batch() {
        let publisher = EventPublisher::new();
        let recorder = Arc::new(Recorder::default());
        publisher.subscribe(recorder.clone());

        let b1 = AggregateId::new("B-1");
        publisher.publish(&b1, &events("B-1", 1..=3, "BookCreated"));
        publisher.publish(&b1, &events("B-1", 4..=4, "BookPriceUpdated"));
        publisher.settled().await;

        assert_eq!(recorder.batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn late_subscriber_only_sees_new_batches() {
        let publisher = EventPublisher::new();
        let b1 = AggregateId::new("B-1");
        publisher.publish(&b1, &events("B-1", 1..=1, "BookCreated"));

        let recorder = Arc::new(Recorder::default());
        publisher.subscribe(recorder.clone());
        publisher.publish(&b1, &events("B-1", 2..=2, "BookPriceUpdated"));
        publisher.settled().await;

        assert_eq!(
            recorder.seen.lock().unwrap().clone(),
            vec![("B-1".to_string(), 2)]
        );
        assert_eq!(publisher.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn unsubscribed_subscriber_stops_receiving() {
        let publisher = EventPublisher::new();
        let recorder = Arc::new(Recorder::default());
        publisher.subscribe(recorder.clone());

        let b1 = AggregateId::new("B-1");
        publisher.publish(&b1, &events("B-1", 1..=1, "BookCreated"));
        assert!(publisher.unsubscribe("recorder"));
        assert!(!publisher.unsubscribe("recorder"));
        publisher.publish(&b1, &events("B-1", 2..=2, "BookPriceUpdated"));
        assert!(publisher.settled().await.is_empty());

        assert_eq!(publisher.subscriber_count(), 0);
        assert!(recorder.failures.lock().unwrap().is_empty());
        assert_eq!(
            recorder.seen.lock().unwrap().clone(),
            vec![("B-1".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn settled_returns_immediately_without_subscribers() {
        let publisher = EventPublisher::new();
        publisher.publish(&AggregateId::new("B-1"), &events("B-1", 1..=1, "BookCreated"));
        publisher.settled().await;
    }
}
