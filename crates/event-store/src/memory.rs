use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventPublisher, EventQuery, EventStoreError, Result, Version,
    store::{EventStore, EventStream, LoadedStream, validate_events_for_append},
};

#[derive(Default)]
struct Log {
    /// Every event in global append order.
    events: Vec<EventEnvelope>,
    /// Positions in `events` per aggregate, in version order.
    streams: HashMap<AggregateId, Vec<usize>>,
}

impl Log {
    fn version_of(&self, aggregate_id: &AggregateId) -> Version {
        self.streams
            .get(aggregate_id)
            .map_or(Version::initial(), |positions| {
                Version::initial().advance(positions.len())
            })
    }
}

/// In-process event store.
///
/// Cloning yields another handle onto the same log. A store created with
/// [`InMemoryEventStore::with_publisher`] publishes every successful batch
/// before the append returns, while still holding the log's write lock, so
/// publication order always matches append order.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<Log>>,
    publisher: Option<EventPublisher>,
}

impl InMemoryEventStore {
    /// Creates a new empty store that publishes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store publishing appended batches to `publisher`.
    pub fn with_publisher(publisher: EventPublisher) -> Self {
        Self {
            log: Arc::default(),
            publisher: Some(publisher),
        }
    }

    /// Returns the publisher attached to this store, if any.
    pub fn publisher(&self) -> Option<&EventPublisher> {
        self.publisher.as_ref()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.events.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip(self, events), fields(events = events.len()))]
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version> {
        validate_events_for_append(aggregate_id, expected_version, &events)?;

        let mut log = self.log.write().await;

        // No await point from here on: the batch lands completely or not at all.
        let current_version = log.version_of(aggregate_id);
        if current_version != expected_version {
            metrics::counter!("event_store_concurrency_conflicts").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: aggregate_id.clone(),
                expected: expected_version,
                actual: current_version,
            });
        }

        let start = log.events.len();
        let count = events.len();
        log.events.extend(events);
        log.streams
            .entry(aggregate_id.clone())
            .or_default()
            .extend(start..start + count);

        if let Some(publisher) = &self.publisher {
            publisher.publish(aggregate_id, &log.events[start..]);
        }

        let new_version = expected_version.advance(count);
        metrics::counter!("event_store_events_appended").increment(count as u64);
        tracing::debug!(%new_version, "events appended");

        Ok(new_version)
    }

    async fn load_stream(&self, aggregate_id: &AggregateId) -> Result<LoadedStream> {
        let log = self.log.read().await;
        let events: Vec<_> = log
            .streams
            .get(aggregate_id)
            .map(|positions| positions.iter().map(|&i| log.events[i].clone()).collect())
            .unwrap_or_default();

        Ok(LoadedStream {
            version: Version::initial().advance(events.len()),
            events,
        })
    }

    async fn get_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let end = self.log.read().await.events.len();
        let log = Arc::clone(&self.log);

        // Reads one event per poll instead of copying the whole log up front.
        let events = stream::unfold(0, move |position| {
            let log = Arc::clone(&log);
            async move {
                if position >= end {
                    return None;
                }
                let event = log.read().await.events[position].clone();
                Some((Ok::<_, EventStoreError>(event), position + 1))
            }
        });

        Ok(Box::pin(events))
    }

    async fn current_version(&self, aggregate_id: &AggregateId) -> Result<Version> {
        Ok(self.log.read().await.version_of(aggregate_id))
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        Ok(query.select(&log.events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStoreExt;
    use futures_util::StreamExt;

    fn create_test_event(aggregate_id: &str, version: u64, event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(AggregateId::new(aggregate_id))
            .aggregate_type("Book")
            .event_type(event_type)
            .version(Version::new(version))
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("B-1");

        let version = store
            .append(&id, Version::initial(), vec![create_test_event("B-1", 1, "BookCreated")])
            .await
            .unwrap();
        assert_eq!(version, Version::first());

        let stream = store.load_stream(&id).await.unwrap();
        assert_eq!(stream.events.len(), 1);
        assert_eq!(stream.version, Version::first());
    }

    #[tokio::test]
    async fn append_batch_is_numbered_from_expected_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("B-1");

        store
            .append(&id, Version::initial(), vec![create_test_event("B-1", 1, "BookCreated")])
            .await
            .unwrap();
        let version = store
            .append(
                &id,
                Version::first(),
                vec![
                    create_test_event("B-1", 2, "BookPriceUpdated"),
                    create_test_event("B-1", 3, "BookPriceUpdated"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(version, Version::new(3));
        let versions: Vec<_> = store
            .load_stream(&id)
            .await
            .unwrap()
            .events
            .iter()
            .map(|e| e.version.as_u64())
            .collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("B-1");

        store
            .append(&id, Version::initial(), vec![create_test_event("B-1", 1, "BookCreated")])
            .await
            .unwrap();

        let result = store
            .append(&id, Version::initial(), vec![create_test_event("B-1", 1, "BookCreated")])
            .await;

        match result {
            Err(EventStoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::initial());
                assert_eq!(actual, Version::first());
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn invalid_batch_appends_nothing() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("B-1");

        let result = store
            .append(
                &id,
                Version::initial(),
                vec![
                    create_test_event("B-1", 1, "BookCreated"),
                    create_test_event("B-1", 3, "BookPriceUpdated"),
                ],
            )
            .await;

        assert!(matches!(result, Err(EventStoreError::InvalidAppend { .. })));
        assert_eq!(store.event_count().await, 0);
        assert!(store.load_stream(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_aggregate_loads_empty_stream() {
        let store = InMemoryEventStore::new();
        let stream = store.load_stream(&AggregateId::new("missing")).await.unwrap();
        assert!(stream.is_empty());
        assert_eq!(stream.version, Version::initial());
    }

    #[tokio::test]
    async fn get_all_events_follows_append_order_and_restarts() {
        let store = InMemoryEventStore::new();
        let b1 = AggregateId::new("B-1");
        let b2 = AggregateId::new("B-2");

        store
            .append(&b1, Version::initial(), vec![create_test_event("B-1", 1, "BookCreated")])
            .await
            .unwrap();
        store
            .append(&b2, Version::initial(), vec![create_test_event("B-2", 1, "BookCreated")])
            .await
            .unwrap();
        store
            .append(&b1, Version::first(), vec![create_test_event("B-1", 2, "BookPriceUpdated")])
            .await
            .unwrap();

        let order = |events: Vec<Result<EventEnvelope>>| -> Vec<(String, u64)> {
            events
                .into_iter()
                .map(|e| e.unwrap())
                .map(|e| (e.aggregate_id.to_string(), e.version.as_u64()))
                .collect()
        };

        let first: Vec<_> = store.get_all_events().await.unwrap().collect().await;
        let second: Vec<_> = store.get_all_events().await.unwrap().collect().await;
        let expected = vec![
            ("B-1".to_string(), 1),
            ("B-2".to_string(), 1),
            ("B-1".to_string(), 2),
        ];
        assert_eq!(order(first), expected);
        assert_eq!(order(second), expected);
    }

    #[tokio::test]
    async fn get_all_events_is_bounded_to_call_time() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("B-1");
        store
            .append(&id, Version::initial(), vec![create_test_event("B-1", 1, "BookCreated")])
            .await
            .unwrap();

        let stream = store.get_all_events().await.unwrap();
        store
            .append(&id, Version::first(), vec![create_test_event("B-1", 2, "BookPriceUpdated")])
            .await
            .unwrap();

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn query_and_type_lookup() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("B-1");
        store
            .append(
                &id,
                Version::initial(),
                vec![
                    create_test_event("B-1", 1, "BookCreated"),
                    create_test_event("B-1", 2, "BookPriceUpdated"),
                    create_test_event("B-1", 3, "BookPriceUpdated"),
                ],
            )
            .await
            .unwrap();

        let updates = store.get_events_by_type("BookPriceUpdated").await.unwrap();
        assert_eq!(updates.len(), 2);

        let results = store
            .query_events(
                EventQuery::for_aggregate(id.clone()).versions(Version::new(2), Version::new(2)),
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].version, Version::new(2));

        assert!(store.aggregate_exists(&id).await.unwrap());
        assert!(!store.aggregate_exists(&AggregateId::new("B-9")).await.unwrap());
        assert_eq!(store.current_version(&id).await.unwrap(), Version::new(3));
    }

    #[tokio::test]
    async fn successful_append_is_published() {
        use crate::{BoxError, EventSubscriber, PublicationFailure};
        use std::sync::Mutex;

        #[derive(Default)]
        struct Collector(Mutex<Vec<String>>);

        #[async_trait]
        impl EventSubscriber for Collector {
            fn name(&self) -> &str {
                "collector"
            }

            async fn on_event(&self, event: &EventEnvelope) -> std::result::Result<(), BoxError> {
                self.0.lock().unwrap().push(event.event_type.clone());
                Ok(())
            }

            async fn on_publication_failure(&self, _failure: &PublicationFailure) {}
        }

        let publisher = EventPublisher::new();
        let collector = Arc::new(Collector::default());
        publisher.subscribe(collector.clone());
        let store = InMemoryEventStore::with_publisher(publisher.clone());
        let id = AggregateId::new("B-1");

        store
            .append(&id, Version::initial(), vec![create_test_event("B-1", 1, "BookCreated")])
            .await
            .unwrap();
        // A rejected append publishes nothing.
        let _ = store
            .append(&id, Version::initial(), vec![create_test_event("B-1", 1, "BookCreated")])
            .await;
        publisher.settled().await;

        assert_eq!(collector.0.lock().unwrap().clone(), vec!["BookCreated"]);
    }
}
