//! Command routing and handling.
//!
//! The [`CommandBus`] owns an explicit registry from command type tag to the
//! handler of the aggregate type that decides on it. Dispatching a command
//! rehydrates that aggregate from its stream, lets it decide, and appends the
//! resulting events with the loaded version as expected version, retrying
//! from the load when another writer got there first.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::AggregateId;
use event_store::{EventEnvelope, EventStore, EventStoreError, Version};

use crate::aggregate::{Aggregate, AggregateCommand, DomainEvent};
use crate::command::Command;
use crate::error::CommandError;

/// Metadata key recording which command produced an event.
pub const COMMAND_TYPE_METADATA: &str = "command_type";

/// Tuning for [`CommandBus::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Extra attempts after a concurrency conflict before giving up.
    pub max_retries: u32,

    /// Base pause before a retry; the n-th retry waits `n * retry_backoff`.
    pub retry_backoff: Duration,

    /// Deadline for a whole dispatch, retries included.
    pub dispatch_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff: Duration::from_millis(5),
            dispatch_timeout: Duration::from_secs(5),
        }
    }
}

/// What a successful dispatch did.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    pub aggregate_id: AggregateId,
    pub aggregate_type: &'static str,
    pub command_type: &'static str,

    /// The aggregate version after the command; unchanged if no events
    /// were produced.
    pub new_version: Version,

    /// The appended envelopes, empty if the command was a no-op.
    pub events: Vec<EventEnvelope>,

    /// Number of load-decide-append rounds it took.
    pub attempts: u32,
}

enum AttemptOutcome {
    Committed {
        new_version: Version,
        events: Vec<EventEnvelope>,
    },
    Conflict {
        expected: Version,
        actual: Version,
    },
}

/// One load-decide-append round for the aggregate type owning a command.
#[async_trait]
trait CommandHandler<S>: Send + Sync {
    fn aggregate_type(&self) -> &'static str;

    async fn attempt(&self, store: &S, command: Command) -> Result<AttemptOutcome, CommandError>;
}

struct AggregateHandler<A>(PhantomData<fn() -> A>);

#[async_trait]
impl<S, A> CommandHandler<S> for AggregateHandler<A>
where
    S: EventStore + 'static,
    A: Aggregate,
{
    fn aggregate_type(&self) -> &'static str {
        A::aggregate_type()
    }

    async fn attempt(&self, store: &S, command: Command) -> Result<AttemptOutcome, CommandError> {
        let aggregate_id = command.aggregate_id().clone();
        let command_type = command.command_type();

        let stream = store.load_stream(&aggregate_id).await?;
        if stream.is_empty() && !command.creates_aggregate() {
            return Err(CommandError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id,
            });
        }
        if let Some(expected) = command.expected_version()
            && expected != stream.version
        {
            return Err(CommandError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: stream.version,
                attempts: 1,
            });
        }

        let aggregate = A::from_stream(&stream)?;
        let command = <A::Command as TryFrom<Command>>::try_from(command)
            .map_err(|other| CommandError::UnknownCommandType(other.command_type().to_string()))?;
        let events = aggregate
            .handle(command)
            .map_err(|e| CommandError::BusinessRuleViolation {
                aggregate_type: A::aggregate_type(),
                reason: e.to_string(),
            })?;

        if events.is_empty() {
            return Ok(AttemptOutcome::Committed {
                new_version: stream.version,
                events: Vec::new(),
            });
        }

        let envelopes = build_envelopes::<A>(&aggregate_id, stream.version, command_type, &events)?;
        match store
            .append(&aggregate_id, stream.version, envelopes.clone())
            .await
        {
            Ok(new_version) => Ok(AttemptOutcome::Committed {
                new_version,
                events: envelopes,
            }),
            Err(EventStoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => Ok(AttemptOutcome::Conflict { expected, actual }),
            Err(e) => Err(e.into()),
        }
    }
}

fn build_envelopes<A: Aggregate>(
    aggregate_id: &AggregateId,
    current_version: Version,
    command_type: &'static str,
    events: &[A::Event],
) -> Result<Vec<EventEnvelope>, CommandError> {
    let mut envelopes = Vec::with_capacity(events.len());
    let mut version = current_version;

    for event in events {
        version = version.next();
        let envelope = EventEnvelope::builder()
            .aggregate_id(aggregate_id.clone())
            .aggregate_type(A::aggregate_type())
            .event_type(event.event_type())
            .version(version)
            .metadata(COMMAND_TYPE_METADATA, command_type.into())
            .payload(event)?
            .build()?;
        envelopes.push(envelope);
    }

    Ok(envelopes)
}

/// Routes commands to their aggregate and persists the outcome.
///
/// Cloning yields another handle onto the same store and registry.
pub struct CommandBus<S> {
    store: S,
    config: BusConfig,
    handlers: Arc<HashMap<&'static str, Arc<dyn CommandHandler<S>>>>,
}

impl<S: Clone> Clone for CommandBus<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config,
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<S: EventStore + 'static> CommandBus<S> {
    /// Starts building a bus over `store`.
    pub fn builder(store: S) -> CommandBusBuilder<S> {
        CommandBusBuilder {
            store,
            config: BusConfig::default(),
            handlers: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Returns every registered command type, sorted.
    pub fn command_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Rehydrates an aggregate from the store without handling a command.
    pub async fn load<A: Aggregate>(&self, aggregate_id: &AggregateId) -> Result<A, CommandError> {
        let stream = self.store.load_stream(aggregate_id).await?;
        Ok(A::from_stream(&stream)?)
    }

    /// Validates, routes and handles one command.
    ///
    /// Concurrency conflicts raised by the append are retried from the load
    /// up to `max_retries` times. Exceeding `dispatch_timeout` fails with
    /// [`CommandError::Timeout`]; the store never holds a partial batch.
    #[tracing::instrument(
        skip(self, command),
        fields(command_type = command.command_type(), aggregate_id = %command.aggregate_id())
    )]
    pub async fn dispatch(&self, command: Command) -> Result<DispatchReceipt, CommandError> {
        command.validate()?;

        let handler = self
            .handlers
            .get(command.command_type())
            .ok_or_else(|| CommandError::UnknownCommandType(command.command_type().to_string()))?;

        let deadline = self.config.dispatch_timeout;
        let result = match tokio::time::timeout(deadline, self.run(handler.as_ref(), command)).await
        {
            Ok(result) => result,
            Err(_) => {
                metrics::counter!("command_bus_timeouts").increment(1);
                Err(CommandError::Timeout { after: deadline })
            }
        };

        match &result {
            Ok(receipt) => tracing::debug!(
                new_version = %receipt.new_version,
                events = receipt.events.len(),
                attempts = receipt.attempts,
                "command handled"
            ),
            Err(e) if e.is_rejection() => tracing::info!(error = %e, "command rejected"),
            Err(e) => tracing::warn!(error = %e, "command failed"),
        }

        result
    }

    async fn run(
        &self,
        handler: &dyn CommandHandler<S>,
        command: Command,
    ) -> Result<DispatchReceipt, CommandError> {
        let aggregate_id = command.aggregate_id().clone();
        let command_type = command.command_type();
        let mut attempt = 1;

        loop {
            match handler.attempt(&self.store, command.clone()).await? {
                AttemptOutcome::Committed {
                    new_version,
                    events,
                } => {
                    return Ok(DispatchReceipt {
                        aggregate_id,
                        aggregate_type: handler.aggregate_type(),
                        command_type,
                        new_version,
                        events,
                        attempts: attempt,
                    });
                }
                AttemptOutcome::Conflict { expected, actual } => {
                    if attempt > self.config.max_retries {
                        return Err(CommandError::ConcurrencyConflict {
                            aggregate_id,
                            expected,
                            actual,
                            attempts: attempt,
                        });
                    }
                    tracing::debug!(attempt, %expected, %actual, "concurrency conflict, retrying");
                    metrics::counter!("command_bus_conflict_retries").increment(1);
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Builder for [`CommandBus`].
pub struct CommandBusBuilder<S> {
    store: S,
    config: BusConfig,
    handlers: Vec<(&'static str, Arc<dyn CommandHandler<S>>)>,
}

impl<S: EventStore + 'static> CommandBusBuilder<S> {
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Routes every command type of `A` to `A`.
    pub fn register<A: Aggregate>(mut self) -> Self {
        let handler: Arc<dyn CommandHandler<S>> = Arc::new(AggregateHandler::<A>(PhantomData));
        for &command_type in <A::Command as AggregateCommand>::COMMAND_TYPES {
            self.handlers.push((command_type, Arc::clone(&handler)));
        }
        self
    }

    /// Builds the bus, failing if a command type was registered twice.
    pub fn build(self) -> Result<CommandBus<S>, CommandError> {
        let mut handlers = HashMap::with_capacity(self.handlers.len());
        for (command_type, handler) in self.handlers {
            if handlers.insert(command_type, handler).is_some() {
                return Err(CommandError::DuplicateRegistration(command_type));
            }
        }

        tracing::debug!(command_types = handlers.len(), "command bus built");
        Ok(CommandBus {
            store: self.store,
            config: self.config,
            handlers: Arc::new(handlers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Book, CreateBook, UpdateBookPrice};
    use crate::money::Money;
    use crate::order::Order;
    use event_store::InMemoryEventStore;

    fn bus() -> CommandBus<InMemoryEventStore> {
        CommandBus::builder(InMemoryEventStore::new())
            .register::<Book>()
            .register::<Order>()
            .build()
            .unwrap()
    }

    fn create_book(id: &str) -> Command {
        CreateBook {
            book_id: AggregateId::new(id),
            isbn: "978-1617294549".to_string(),
            title: "Functional and Reactive Domain Modeling".to_string(),
            description: String::new(),
            price: Money::from_cents(4499),
        }
        .into()
    }

    #[test]
    fn default_config() {
        let config = BusConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff, Duration::from_millis(5));
        assert_eq!(config.dispatch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn registry_lists_command_types() {
        assert_eq!(
            bus().command_types(),
            vec!["ActivateOrder", "CreateBook", "PlaceOrder", "UpdateBookPrice"]
        );
    }

    #[test]
    fn duplicate_registration_fails() {
        let result = CommandBus::builder(InMemoryEventStore::new())
            .register::<Book>()
            .register::<Book>()
            .build();
        assert!(matches!(
            result,
            Err(CommandError::DuplicateRegistration("CreateBook" | "UpdateBookPrice"))
        ));
    }

    #[tokio::test]
    async fn envelopes_carry_routing_metadata() {
        let bus = bus();
        let receipt = bus.dispatch(create_book("B-1")).await.unwrap();

        assert_eq!(receipt.aggregate_type, "Book");
        assert_eq!(receipt.command_type, "CreateBook");
        assert_eq!(receipt.attempts, 1);
        assert_eq!(receipt.events.len(), 1);

        let envelope = &receipt.events[0];
        assert_eq!(envelope.event_type, "BookCreated");
        assert_eq!(envelope.aggregate_type, "Book");
        assert_eq!(envelope.version, Version::first());
        assert_eq!(envelope.metadata[COMMAND_TYPE_METADATA], "CreateBook");
    }

    #[tokio::test]
    async fn no_op_command_appends_nothing() {
        let bus = bus();
        bus.dispatch(create_book("B-1")).await.unwrap();

        let receipt = bus
            .dispatch(UpdateBookPrice::new(AggregateId::new("B-1"), Money::from_cents(4499)).into())
            .await
            .unwrap();

        assert!(receipt.events.is_empty());
        assert_eq!(receipt.new_version, Version::first());
        assert_eq!(bus.store().event_count().await, 1);
    }

    #[tokio::test]
    async fn unregistered_aggregate_is_unknown() {
        let bus = CommandBus::builder(InMemoryEventStore::new())
            .register::<Order>()
            .build()
            .unwrap();

        let result = bus.dispatch(create_book("B-1")).await;
        assert!(matches!(result, Err(CommandError::UnknownCommandType(t)) if t == "CreateBook"));
    }

    #[tokio::test]
    async fn load_rehydrates_aggregate() {
        let bus = bus();
        bus.dispatch(create_book("B-1")).await.unwrap();

        let book: Book = bus.load(&AggregateId::new("B-1")).await.unwrap();
        assert_eq!(book.version(), Version::first());
        assert_eq!(book.price(), Money::from_cents(4499));
    }
}
