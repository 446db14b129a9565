//! Full event-log dump for audit and debugging tools.

use futures_util::StreamExt;
use serde::Serialize;

use crate::{Result, store::EventStore};

/// One line of the diagnostic log dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventLogEntry {
    /// The event type tag.
    pub event_type: String,
    /// Human-readable rendering of the whole envelope.
    pub description: String,
}

pub(crate) async fn dump<S: EventStore + ?Sized>(store: &S) -> Result<Vec<EventLogEntry>> {
    let mut events = store.get_all_events().await?;
    let mut entries = Vec::new();

    while let Some(event) = events.next().await {
        let event = event?;
        entries.push(EventLogEntry {
            description: event.to_string(),
            event_type: event.event_type,
        });
    }

    tracing::info!(events = entries.len(), "event log dumped");
    Ok(entries)
}
