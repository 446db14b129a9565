use chrono::{DateTime, Utc};

use crate::{AggregateId, EventEnvelope, Version};

/// Filter over the global event log, used by diagnostic and replay tooling.
///
/// Every criterion left unset matches all events. Results keep global
/// append order; `offset` and `limit` apply after filtering.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub aggregate_id: Option<AggregateId>,
    pub aggregate_type: Option<String>,
    /// Any of these event types.
    pub event_types: Option<Vec<String>>,
    /// Inclusive lower version bound.
    pub from_version: Option<Version>,
    /// Inclusive upper version bound.
    pub to_version: Option<Version>,
    /// Inclusive lower timestamp bound.
    pub from_timestamp: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound.
    pub to_timestamp: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl EventQuery {
    /// Creates a query matching every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific aggregate.
    pub fn for_aggregate(aggregate_id: AggregateId) -> Self {
        Self {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        }
    }

    /// Creates a query for events of a specific type.
    pub fn for_event_type(event_type: impl Into<String>) -> Self {
        Self {
            event_types: Some(vec![event_type.into()]),
            ..Default::default()
        }
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn event_types<I, T>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.event_types = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn versions(mut self, from: Version, to: Version) -> Self {
        self.from_version = Some(from);
        self.to_version = Some(to);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(from);
        self.to_timestamp = Some(to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the event satisfies every filter of this query.
    pub fn matches(&self, event: &EventEnvelope) -> bool {
        self.aggregate_id
            .as_ref()
            .is_none_or(|id| &event.aggregate_id == id)
            && self
                .aggregate_type
                .as_ref()
                .is_none_or(|t| &event.aggregate_type == t)
            && self
                .event_types
                .as_ref()
                .is_none_or(|types| types.contains(&event.event_type))
            && self.from_version.is_none_or(|v| event.version >= v)
            && self.to_version.is_none_or(|v| event.version <= v)
            && self.from_timestamp.is_none_or(|t| event.timestamp >= t)
            && self.to_timestamp.is_none_or(|t| event.timestamp <= t)
    }

    /// Applies the filters, offset and limit to events in log order.
    pub fn select<'a, I>(&self, events: I) -> Vec<EventEnvelope>
    where
        I: IntoIterator<Item = &'a EventEnvelope>,
    {
        events
            .into_iter()
            .filter(|e| self.matches(e))
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}
