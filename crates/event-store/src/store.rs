use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{
    AggregateId, EventEnvelope, EventLogEntry, EventQuery, EventStoreError, Result, Version,
};

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// The complete event history of one aggregate.
#[derive(Debug, Clone, Default)]
pub struct LoadedStream {
    /// Events in version order (oldest first).
    pub events: Vec<EventEnvelope>,

    /// The current version, equal to the number of events.
    pub version: Version,
}

impl LoadedStream {
    /// Returns true if the aggregate has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Core trait for event store implementations.
///
/// The event log is append-only: events are never updated or deleted.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events to one aggregate.
    ///
    /// The batch is appended atomically. It fails with `ConcurrencyConflict`
    /// if the persisted version of the aggregate differs from
    /// `expected_version`, and with `InvalidAppend` if the batch is empty, targets
    /// another aggregate, or is not numbered `expected_version + 1 ..`.
    ///
    /// Returns the new version of the aggregate.
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version>;

    /// Loads the full, ordered event stream of an aggregate.
    ///
    /// Unknown aggregates yield an empty stream at version 0.
    async fn load_stream(&self, aggregate_id: &AggregateId) -> Result<LoadedStream>;

    /// Streams every event in the store in global append order.
    ///
    /// The stream is bounded to the events present when it was requested;
    /// request a new one to start over.
    async fn get_all_events(&self) -> Result<EventStream>;

    /// Gets the current version of an aggregate (0 if it has no events).
    async fn current_version(&self, aggregate_id: &AggregateId) -> Result<Version>;

    /// Retrieves events matching a query, in global append order.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version> {
        (**self).append(aggregate_id, expected_version, events).await
    }

    async fn load_stream(&self, aggregate_id: &AggregateId) -> Result<LoadedStream> {
        (**self).load_stream(aggregate_id).await
    }

    async fn get_all_events(&self) -> Result<EventStream> {
        (**self).get_all_events().await
    }

    async fn current_version(&self, aggregate_id: &AggregateId) -> Result<Version> {
        (**self).current_version(aggregate_id).await
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        (**self).query_events(query).await
    }
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Checks if an aggregate exists (has any events).
    async fn aggregate_exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
        Ok(self.current_version(aggregate_id).await? > Version::initial())
    }

    /// Retrieves events by type.
    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        self.query_events(EventQuery::for_event_type(event_type)).await
    }

    /// Dumps the whole log as `(event type, description)` entries.
    ///
    /// Meant for audit and debugging tooling only.
    async fn event_log(&self) -> Result<Vec<EventLogEntry>> {
        crate::diagnostics::dump(self).await
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates a batch before it is appended at `expected_version`.
pub fn validate_events_for_append(
    aggregate_id: &AggregateId,
    expected_version: Version,
    events: &[EventEnvelope],
) -> Result<()> {
    let invalid = |reason: String| EventStoreError::InvalidAppend {
        aggregate_id: aggregate_id.clone(),
        reason,
    };

    let Some(first) = events.first() else {
        return Err(invalid("cannot append an empty event list".to_string()));
    };

    let mut version = expected_version;
    for event in events {
        if &event.aggregate_id != aggregate_id {
            return Err(invalid(format!(
                "event {} belongs to aggregate {}",
                event.event_id, event.aggregate_id
            )));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(invalid(
                "all events must have the same aggregate type".to_string(),
            ));
        }
        version = version.next();
        if event.version != version {
            return Err(invalid(format!(
                "event versions must be sequential: expected {}, got {}",
                version, event.version
            )));
        }
    }

    Ok(())
}
