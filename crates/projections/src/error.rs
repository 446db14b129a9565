//! Projection error types.

use common::AggregateId;
use event_store::Version;
use thiserror::Error;

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// Failed to deserialize an event payload.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An event arrived before its predecessor in the aggregate's stream.
    #[error(
        "{projection} missed events of {aggregate_id}: expected version {expected}, got {actual}"
    )]
    VersionGap {
        projection: &'static str,
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// No projection with this name is registered.
    #[error("Unknown projection: {0}")]
    UnknownProjection(String),

    /// A projection with this name is already registered.
    #[error("Projection {0} is already registered")]
    DuplicateProjection(&'static str),

    /// A projection-specific error.
    #[error("Projection error: {0}")]
    Projection(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
