//! Book aggregate implementation.

use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::money::Money;

use super::{
    BookCommand, BookError, BookEvent, CreateBook, UpdateBookPrice,
    events::{BookCreatedData, BookPriceUpdatedData},
};

/// Book aggregate root: one catalog entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Book {
    id: Option<AggregateId>,
    version: Version,
    isbn: String,
    title: String,
    description: String,
    price: Money,
}

impl Aggregate for Book {
    type Event = BookEvent;
    type Command = BookCommand;
    type Error = BookError;

    fn aggregate_type() -> &'static str {
        "Book"
    }

    fn id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            BookEvent::BookCreated(data) => {
                self.id = Some(data.book_id);
                self.isbn = data.isbn;
                self.title = data.title;
                self.description = data.description;
                self.price = data.price;
            }
            BookEvent::BookPriceUpdated(data) => {
                self.price = data.new_price;
            }
        }
    }

    fn handle(&self, command: BookCommand) -> Result<Vec<BookEvent>, BookError> {
        match command {
            BookCommand::Create(c) => self.create(c),
            BookCommand::UpdatePrice(c) => self.update_price(c),
        }
    }
}

// Query methods
impl Book {
    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }
}

// Command methods (return events)
impl Book {
    fn create(&self, command: CreateBook) -> Result<Vec<BookEvent>, BookError> {
        if self.id.is_some() {
            return Err(BookError::AlreadyExists);
        }
        if !command.price.is_positive() {
            return Err(BookError::InvalidPrice {
                price: command.price,
            });
        }

        Ok(vec![BookEvent::BookCreated(BookCreatedData {
            book_id: command.book_id,
            isbn: command.isbn,
            title: command.title,
            description: command.description,
            price: command.price,
        })])
    }

    fn update_price(&self, command: UpdateBookPrice) -> Result<Vec<BookEvent>, BookError> {
        let Some(id) = &self.id else {
            return Err(BookError::NotCreated);
        };
        if !command.price.is_positive() {
            return Err(BookError::InvalidPrice {
                price: command.price,
            });
        }
        if command.price == self.price {
            return Ok(vec![]);
        }

        Ok(vec![BookEvent::BookPriceUpdated(BookPriceUpdatedData {
            book_id: id.clone(),
            old_price: self.price,
            new_price: command.price,
        })])
    }
}
