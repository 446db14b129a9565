//! Command handling error types.

use std::time::Duration;

use common::AggregateId;
use event_store::{EventStoreError, Version};
use thiserror::Error;

/// A command is malformed: a required field is absent or blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {command} command: `{field}` is required")]
pub struct ValidationError {
    pub command: &'static str,
    pub field: &'static str,
}

impl ValidationError {
    /// Fails with a `ValidationError` unless `present` holds.
    pub fn require(
        command: &'static str,
        field: &'static str,
        present: bool,
    ) -> Result<(), ValidationError> {
        if present {
            Ok(())
        } else {
            Err(ValidationError { command, field })
        }
    }
}

/// Errors returned by [`CommandBus::dispatch`](crate::CommandBus::dispatch).
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command failed structural validation; nothing was loaded or stored.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No handler is registered for the command type.
    #[error("No handler registered for command type {0}")]
    UnknownCommandType(String),

    /// Two aggregates claimed the same command type while building the bus.
    #[error("Command type {0} is registered more than once")]
    DuplicateRegistration(&'static str),

    /// The command requires an existing aggregate but the stream is empty.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// The aggregate rejected the command. No events were stored.
    #[error("{aggregate_type} rejected the command: {reason}")]
    BusinessRuleViolation {
        aggregate_type: &'static str,
        reason: String,
    },

    /// The aggregate changed under the command and retries were exhausted,
    /// or the command was issued against a stale version.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id} after {attempts} attempt(s): expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
        attempts: u32,
    },

    /// The dispatch deadline passed before the command was committed.
    #[error("Command dispatch timed out after {after:?}")]
    Timeout { after: Duration },

    /// Any other event store failure.
    #[error("Event store error: {0}")]
    EventStore(EventStoreError),

    /// An event payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CommandError {
    /// True for failures worth retrying later: conflicts and timeouts.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CommandError::ConcurrencyConflict { .. } | CommandError::Timeout { .. }
        )
    }

    /// True for permanent rejections the caller has to fix.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CommandError::Validation(_)
                | CommandError::UnknownCommandType(_)
                | CommandError::AggregateNotFound { .. }
                | CommandError::BusinessRuleViolation { .. }
        )
    }
}

impl From<EventStoreError> for CommandError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => CommandError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
                attempts: 1,
            },
            EventStoreError::Serialization(e) => CommandError::Serialization(e),
            other => CommandError::EventStore(other),
        }
    }
}
