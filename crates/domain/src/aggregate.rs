//! Core aggregate and domain event traits.

use std::fmt::Debug;

use common::AggregateId;
use event_store::{LoadedStream, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::command::Command;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Debug + Send + Sync {
    /// Returns the event type name.
    ///
    /// This is used for serialization and event store filtering.
    fn event_type(&self) -> &'static str;
}

/// The slice of [`Command`] one aggregate type handles.
///
/// Converting from [`Command`] hands the command back unchanged when it
/// belongs to another aggregate.
pub trait AggregateCommand: TryFrom<Command, Error = Command> + Send + Sync {
    /// Command type tags routed to the owning aggregate.
    const COMMAND_TYPES: &'static [&'static str];
}

/// Trait for aggregates in an event-sourced system.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying events on every command
/// - Decide on commands by returning events, never by mutating themselves
/// - Apply events to update state (pure, deterministic)
pub trait Aggregate: Default + Send + Sync + Sized + 'static {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The commands this aggregate decides on.
    type Command: AggregateCommand;

    /// Business rule violations raised by [`Aggregate::handle`].
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identifier, or `None` before its first event.
    fn id(&self) -> Option<&AggregateId>;

    /// Returns the version of the last applied event (0 for a new aggregate).
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be pure and deterministic, and must not fail: events are facts.
    fn apply(&mut self, event: Self::Event);

    /// Validates a command against the current state and returns the
    /// resulting events. An empty list means there is nothing to record.
    fn handle(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Rehydrates an aggregate by folding its stored stream over `Default`.
    fn from_stream(stream: &LoadedStream) -> Result<Self, serde_json::Error> {
        let mut aggregate = Self::default();
        for envelope in &stream.events {
            let event: Self::Event = serde_json::from_value(envelope.payload.clone())?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }
        Ok(aggregate)
    }
}
