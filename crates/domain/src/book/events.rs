//! Book domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;

/// Events that can occur on a book aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookEvent {
    /// Book was added to the catalog.
    BookCreated(BookCreatedData),

    /// Book price changed.
    BookPriceUpdated(BookPriceUpdatedData),
}

impl BookEvent {
    pub const CREATED: &'static str = "BookCreated";
    pub const PRICE_UPDATED: &'static str = "BookPriceUpdated";
}

impl DomainEvent for BookEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookEvent::BookCreated(_) => Self::CREATED,
            BookEvent::BookPriceUpdated(_) => Self::PRICE_UPDATED,
        }
    }
}

/// Data for BookCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookCreatedData {
    pub book_id: AggregateId,
    pub isbn: String,
    pub title: String,
    pub description: String,
    pub price: Money,
}

/// Data for BookPriceUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookPriceUpdatedData {
    pub book_id: AggregateId,
    pub old_price: Money,
    pub new_price: Money,
}
