//! Book aggregate and related types.

mod aggregate;
mod commands;
mod events;

pub use aggregate::Book;
pub use commands::{BookCommand, CreateBook, UpdateBookPrice};
pub use events::{BookCreatedData, BookEvent, BookPriceUpdatedData};

use thiserror::Error;

use crate::money::Money;

/// Business rules a book command can violate.
#[derive(Debug, Error)]
pub enum BookError {
    /// The book already has events.
    #[error("Book already exists")]
    AlreadyExists,

    /// The book has no events yet.
    #[error("Book does not exist")]
    NotCreated,

    /// Prices must be greater than zero.
    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: Money },
}
