//! Process wiring for the bookstore admin core.
//!
//! [`AdminContext`] builds the whole write and read path explicitly:
//! publisher, store, command bus with every aggregate registered, the
//! projection engine with every view registered and caught up, and the
//! query service over those views.

pub mod config;
pub mod telemetry;

use domain::{
    Book, CommandBus, CommandError, DispatchReceipt, Order, PublisherContract,
};
use event_store::{
    EventLogEntry, EventPublisher, EventStoreError, EventStoreExt, InMemoryEventStore,
};
use projections::{
    BookCatalogView, OrderListView, OrdersPerDayView, ProjectionEngine, ProjectionError,
    ProjectionStatus, QueryService,
};
use thiserror::Error;

pub use config::{AdminConfig, ConfigError};
pub use domain::Command;

/// Errors raised while starting or maintaining the admin context.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),
}

/// The running admin core.
pub struct AdminContext {
    config: AdminConfig,
    publisher: EventPublisher,
    store: InMemoryEventStore,
    bus: CommandBus<InMemoryEventStore>,
    engine: ProjectionEngine<InMemoryEventStore>,
    queries: QueryService,
}

impl AdminContext {
    /// Wires every component together over an empty in-memory log.
    ///
    /// Must be called from within a Tokio runtime, since projections spawn
    /// their delivery tasks on registration.
    #[tracing::instrument(skip_all)]
    pub async fn bootstrap(config: AdminConfig) -> Result<Self, AdminError> {
        let publisher = EventPublisher::new();
        let store = InMemoryEventStore::with_publisher(publisher.clone());

        let bus = CommandBus::builder(store.clone())
            .config(config.bus_config())
            .register::<Book>()
            .register::<Order>()
            .register::<PublisherContract>()
            .build()?;

        let mut engine = ProjectionEngine::new(store.clone(), publisher.clone());
        let orders = engine.register::<OrderListView>().await?;
        let orders_per_day = engine.register::<OrdersPerDayView>().await?;
        let books = engine.register::<BookCatalogView>().await?;
        let queries = QueryService::new(orders, orders_per_day, books);

        tracing::info!(
            commands = bus.command_types().len(),
            projections = engine.projection_names().len(),
            "admin context ready"
        );

        Ok(Self {
            config,
            publisher,
            store,
            bus,
            engine,
            queries,
        })
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn bus(&self) -> &CommandBus<InMemoryEventStore> {
        &self.bus
    }

    pub fn store(&self) -> &InMemoryEventStore {
        &self.store
    }

    pub fn engine(&self) -> &ProjectionEngine<InMemoryEventStore> {
        &self.engine
    }

    /// Read side. Reflects a dispatch once [`AdminContext::settled`] returns.
    pub fn queries(&self) -> &QueryService {
        &self.queries
    }

    /// Dispatches a command through the bus.
    pub async fn dispatch(&self, command: Command) -> Result<DispatchReceipt, CommandError> {
        self.bus.dispatch(command).await
    }

    /// Waits until every projection has handled every event appended so far.
    ///
    /// Returns the names of projections whose delivery task stopped.
    pub async fn settled(&self) -> Vec<String> {
        self.publisher.settled().await
    }

    /// Dumps the full event log in append order.
    pub async fn event_log(&self) -> Result<Vec<EventLogEntry>, AdminError> {
        Ok(self.store.event_log().await?)
    }

    pub fn projection_status(&self) -> Vec<ProjectionStatus> {
        self.engine.status()
    }

    /// Rebuilds every projection that missed an event.
    pub async fn rebuild_stale(&self) -> Result<Vec<&'static str>, AdminError> {
        let rebuilt = self.engine.rebuild_stale().await?;
        if !rebuilt.is_empty() {
            metrics::counter!("admin_stale_rebuilds").increment(rebuilt.len() as u64);
            tracing::warn!(projections = ?rebuilt, "stale projections rebuilt");
        }
        Ok(rebuilt)
    }
}
