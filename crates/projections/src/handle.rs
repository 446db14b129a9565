//! Live, rebuildable projection state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::AggregateId;
use event_store::{
    BoxError, EventEnvelope, EventStore, EventSubscriber, PublicationFailure, Version,
};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::projection::{Projection, ProjectionPosition, ProjectionStatus};
use crate::{ProjectionError, Result};

#[derive(Default)]
struct Working<P> {
    view: P,
    /// Last version seen per aggregate, whatever the event type.
    applied: HashMap<AggregateId, Version>,
    position: ProjectionPosition,
    stale: bool,
    /// Applied events not yet visible in the snapshot.
    dirty: bool,
}

impl<P: Projection> Working<P> {
    /// Feeds one event through deduplication and gap detection.
    ///
    /// Returns false for redelivered events.
    fn ingest(&mut self, event: &EventEnvelope) -> Result<bool> {
        let last = self
            .applied
            .get(&event.aggregate_id)
            .copied()
            .unwrap_or_default();

        if event.version <= last {
            return Ok(false);
        }
        if event.version != last.next() {
            return Err(ProjectionError::VersionGap {
                projection: P::NAME,
                aggregate_id: event.aggregate_id.clone(),
                expected: last.next(),
                actual: event.version,
            });
        }

        if P::EVENT_TYPES.contains(&event.event_type.as_str()) {
            self.view.apply(event)?;
        }
        self.applied.insert(event.aggregate_id.clone(), event.version);
        self.position = self.position.advance();
        Ok(true)
    }

    fn applied_version(&self, aggregate_id: &AggregateId) -> Version {
        self.applied.get(aggregate_id).copied().unwrap_or_default()
    }
}

/// One registered projection: its working state and its published snapshot.
///
/// Events are folded into the working state under an async mutex. Once a
/// delivered batch is through, the view is copied into an immutable `Arc`
/// snapshot that readers take without waiting on the writer.
///
/// A version gap or a failing `apply` marks the projection stale. A stale
/// projection ignores further events and keeps serving its last good
/// snapshot until [`ProjectionHandle::rebuild`] replays the log.
pub struct ProjectionHandle<P> {
    working: Mutex<Working<P>>,
    snapshot: RwLock<Arc<P>>,
    stale: AtomicBool,
    events_processed: AtomicU64,
}

impl<P: Projection> Default for ProjectionHandle<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Projection> ProjectionHandle<P> {
    /// Creates a handle holding an empty view.
    pub fn new() -> Self {
        Self {
            working: Mutex::new(Working::default()),
            snapshot: RwLock::new(Arc::new(P::default())),
            stale: AtomicBool::new(false),
            events_processed: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        P::NAME
    }

    /// Returns the current view. Never blocks on event processing.
    pub fn snapshot(&self) -> Arc<P> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    pub fn status(&self) -> ProjectionStatus {
        ProjectionStatus {
            name: P::NAME,
            events_processed: self.events_processed.load(Ordering::Acquire),
            stale: self.is_stale(),
        }
    }

    fn publish(&self, working: &mut Working<P>) {
        let view = Arc::new(working.view.clone());
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = view;
        working.dirty = false;
        self.events_processed
            .store(working.position.events_processed, Ordering::Release);
    }

    fn mark_stale(&self, working: &mut Working<P>, reason: &str) {
        if !working.stale {
            tracing::warn!(projection = P::NAME, reason, "projection marked stale");
        }
        working.stale = true;
        self.stale.store(true, Ordering::Release);
    }

    /// Replaces the view with one rebuilt from the whole event log.
    ///
    /// Event delivery waits while the rebuild runs; events delivered
    /// afterwards that the rebuild already covered are discarded as
    /// redeliveries. On failure the projection stays stale.
    #[tracing::instrument(skip_all, fields(projection = P::NAME))]
    pub async fn rebuild<S: EventStore + ?Sized>(&self, store: &S) -> Result<()> {
        let mut working = self.working.lock().await;

        let mut fresh = Working::<P>::default();
        let replayed = async {
            let mut events = store.get_all_events().await?;
            while let Some(event) = events.next().await {
                fresh.ingest(&event?)?;
            }
            Ok::<_, ProjectionError>(())
        }
        .await;

        if let Err(error) = replayed {
            self.mark_stale(&mut working, &error.to_string());
            return Err(error);
        }

        *working = fresh;
        self.publish(&mut working);
        self.stale.store(false, Ordering::Release);

        metrics::counter!("projections_rebuilds").increment(1);
        tracing::info!(
            events_processed = working.position.events_processed,
            "projection rebuilt"
        );
        Ok(())
    }
}

#[async_trait]
impl<P: Projection> EventSubscriber for ProjectionHandle<P> {
    fn name(&self) -> &str {
        P::NAME
    }

    async fn on_event(&self, event: &EventEnvelope) -> std::result::Result<(), BoxError> {
        let mut working = self.working.lock().await;
        if working.stale {
            return Ok(());
        }

        match working.ingest(event) {
            Ok(true) => {
                working.dirty = true;
                self.events_processed
                    .store(working.position.events_processed, Ordering::Release);
                metrics::counter!("projections_events_processed").increment(1);
                Ok(())
            }
            Ok(false) => {
                tracing::trace!(
                    projection = P::NAME,
                    aggregate_id = %event.aggregate_id,
                    version = %event.version,
                    "redelivered event skipped"
                );
                Ok(())
            }
            Err(error) => {
                self.mark_stale(&mut working, &error.to_string());
                Err(error.into())
            }
        }
    }

    async fn on_publication_failure(&self, failure: &PublicationFailure) {
        let mut working = self.working.lock().await;
        // Failures for events a rebuild has since covered are moot.
        if failure.version > working.applied_version(&failure.aggregate_id) {
            self.mark_stale(&mut working, &failure.reason);
        }
    }

    async fn on_batch_end(&self) {
        let mut working = self.working.lock().await;
        if working.dirty && !working.stale {
            self.publish(&mut working);
        }
    }
}
