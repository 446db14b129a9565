//! Book catalog read model.

use std::collections::BTreeMap;

use common::AggregateId;
use domain::{BookEvent, Money};
use event_store::{EventEnvelope, Version};
use serde::Serialize;

use crate::projection::Projection;
use crate::{ProjectionError, Result};

/// Current catalog entry for one book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookView {
    pub book_id: AggregateId,
    pub isbn: String,
    pub title: String,
    pub description: String,
    pub price: Money,

    /// Version of the book this row reflects.
    pub version: Version,
}

/// All books, keyed by book id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookCatalogView {
    books: BTreeMap<AggregateId, BookView>,
}

impl BookCatalogView {
    pub fn get_book(&self, book_id: &AggregateId) -> Option<&BookView> {
        self.books.get(book_id)
    }

    /// Returns every book ordered by id.
    pub fn list_books(&self) -> Vec<BookView> {
        self.books.values().cloned().collect()
    }
}

impl Projection for BookCatalogView {
    const NAME: &'static str = "BookCatalogView";
    const EVENT_TYPES: &'static [&'static str] = &[BookEvent::CREATED, BookEvent::PRICE_UPDATED];

    fn apply(&mut self, event: &EventEnvelope) -> Result<()> {
        match serde_json::from_value::<BookEvent>(event.payload.clone())? {
            BookEvent::BookCreated(data) => {
                self.books.insert(
                    data.book_id.clone(),
                    BookView {
                        book_id: data.book_id,
                        isbn: data.isbn,
                        title: data.title,
                        description: data.description,
                        price: data.price,
                        version: event.version,
                    },
                );
            }
            BookEvent::BookPriceUpdated(data) => {
                let book = self.books.get_mut(&data.book_id).ok_or_else(|| {
                    ProjectionError::Projection(format!(
                        "price update of unknown book {}",
                        data.book_id
                    ))
                })?;
                book.price = data.new_price;
                book.version = event.version;
            }
        }
        Ok(())
    }
}
