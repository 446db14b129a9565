//! Registration and maintenance of projections.

use std::sync::Arc;

use async_trait::async_trait;
use event_store::{EventPublisher, EventStore};

use crate::handle::ProjectionHandle;
use crate::projection::{Projection, ProjectionStatus};
use crate::{ProjectionError, Result};

/// Type-erased view of a [`ProjectionHandle`] for bulk maintenance.
#[async_trait]
trait ManagedProjection: Send + Sync {
    fn name(&self) -> &'static str;

    fn status(&self) -> ProjectionStatus;

    async fn rebuild(&self, store: &dyn EventStore) -> Result<()>;
}

#[async_trait]
impl<P: Projection> ManagedProjection for ProjectionHandle<P> {
    fn name(&self) -> &'static str {
        P::NAME
    }

    fn status(&self) -> ProjectionStatus {
        ProjectionHandle::status(self)
    }

    async fn rebuild(&self, store: &dyn EventStore) -> Result<()> {
        ProjectionHandle::rebuild(self, store).await
    }
}

/// Keeps every registered projection subscribed to the publisher and
/// rebuilds them from the store on request.
pub struct ProjectionEngine<S> {
    store: S,
    publisher: EventPublisher,
    projections: Vec<Arc<dyn ManagedProjection>>,
}

impl<S: EventStore + 'static> ProjectionEngine<S> {
    /// Creates an engine over `store`, subscribing projections to `publisher`.
    ///
    /// `publisher` must be the one the store publishes appends to.
    pub fn new(store: S, publisher: EventPublisher) -> Self {
        Self {
            store,
            publisher,
            projections: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Subscribes a new projection and catches it up with the log.
    ///
    /// Subscribing first and replaying second means no event falls between
    /// the two; events seen by both are discarded as redeliveries. A failed
    /// catch-up removes the subscription again.
    pub async fn register<P: Projection>(&mut self) -> Result<Arc<ProjectionHandle<P>>> {
        if self.projections.iter().any(|p| p.name() == P::NAME) {
            return Err(ProjectionError::DuplicateProjection(P::NAME));
        }

        let handle = Arc::new(ProjectionHandle::<P>::new());
        self.publisher.subscribe(handle.clone());
        if let Err(error) = handle.rebuild(&self.store).await {
            self.publisher.unsubscribe(P::NAME);
            tracing::error!(projection = P::NAME, %error, "projection catch-up failed");
            return Err(error);
        }

        tracing::info!(projection = P::NAME, "projection registered");
        self.projections.push(handle.clone());
        Ok(handle)
    }

    /// Names of all registered projections, in registration order.
    pub fn projection_names(&self) -> Vec<&'static str> {
        self.projections.iter().map(|p| p.name()).collect()
    }

    /// Rebuilds the named projection from the full log.
    pub async fn rebuild(&self, name: &str) -> Result<()> {
        let projection = self
            .projections
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| ProjectionError::UnknownProjection(name.to_string()))?;
        projection.rebuild(&self.store).await
    }

    /// Rebuilds every projection, stopping at the first failure.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        for projection in &self.projections {
            projection.rebuild(&self.store).await?;
        }
        Ok(())
    }

    /// Rebuilds the projections currently marked stale and returns their
    /// names.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_stale(&self) -> Result<Vec<&'static str>> {
        let mut rebuilt = Vec::new();
        for projection in &self.projections {
            if projection.status().stale {
                projection.rebuild(&self.store).await?;
                rebuilt.push(projection.name());
            }
        }
        Ok(rebuilt)
    }

    pub fn stale_projections(&self) -> Vec<&'static str> {
        self.projections
            .iter()
            .filter(|p| p.status().stale)
            .map(|p| p.name())
            .collect()
    }

    pub fn status(&self) -> Vec<ProjectionStatus> {
        self.projections.iter().map(|p| p.status()).collect()
    }
}
