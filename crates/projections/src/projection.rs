//! Core projection trait and position tracking.

use event_store::EventEnvelope;
use serde::Serialize;

use crate::Result;

/// Tracks how many events a projection has processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionPosition {
    /// Number of events processed by this projection.
    pub events_processed: u64,
}

impl ProjectionPosition {
    /// Creates a new position at zero.
    pub fn zero() -> Self {
        Self {
            events_processed: 0,
        }
    }

    /// Advances the position by one event.
    pub fn advance(&self) -> Self {
        Self {
            events_processed: self.events_processed + 1,
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.events_processed)
    }
}

/// A read model derived from the event log.
///
/// `apply` must be deterministic and depend only on the events it is
/// given, in per-aggregate order. Redelivery and ordering are handled by
/// [`ProjectionHandle`](crate::ProjectionHandle): `apply` only ever sees
/// each event once, and only events whose type is listed in `EVENT_TYPES`.
pub trait Projection: Clone + Default + Send + Sync + 'static {
    /// Name used in logs, status reports and rebuild requests.
    const NAME: &'static str;

    /// Event type tags this projection reacts to.
    const EVENT_TYPES: &'static [&'static str];

    /// Folds one event into the view.
    fn apply(&mut self, event: &EventEnvelope) -> Result<()>;
}

/// Health of one registered projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionStatus {
    pub name: &'static str,
    pub events_processed: u64,

    /// True when the view may have missed events and awaits a rebuild.
    pub stale: bool,
}
