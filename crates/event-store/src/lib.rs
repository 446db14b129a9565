//! Append-only event store for the bookstore admin core.
//!
//! - [`EventStore`] trait: optimistic-concurrency append, stream replay,
//!   global log iteration and filtered queries
//! - [`InMemoryEventStore`]: the in-process implementation
//! - [`EventPublisher`]: in-order, at-least-once delivery of appended events
//!   to registered [`EventSubscriber`]s

pub mod diagnostics;
pub mod error;
pub mod event;
pub mod memory;
pub mod publisher;
pub mod query;
pub mod store;

pub use common::AggregateId;
pub use diagnostics::EventLogEntry;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use publisher::{BoxError, EventPublisher, EventSubscriber, PublicationFailure};
pub use query::EventQuery;
pub use store::{EventStore, EventStoreExt, EventStream, LoadedStream};
