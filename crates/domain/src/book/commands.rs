//! Book commands.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateCommand;
use crate::command::Command;
use crate::error::ValidationError;
use crate::money::Money;

/// Command to add a book to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBook {
    pub book_id: AggregateId,
    pub isbn: String,
    pub title: String,
    pub description: String,
    pub price: Money,
}

impl CreateBook {
    pub const COMMAND_TYPE: &'static str = "CreateBook";

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require(Self::COMMAND_TYPE, "isbn", !self.isbn.trim().is_empty())?;
        ValidationError::require(Self::COMMAND_TYPE, "title", !self.title.trim().is_empty())
    }
}

/// Command to change the price of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBookPrice {
    pub book_id: AggregateId,
    pub price: Money,

    /// The book version the caller saw. When set, the update is refused if
    /// the book has changed since.
    #[serde(default)]
    pub expected_version: Option<Version>,
}

impl UpdateBookPrice {
    pub const COMMAND_TYPE: &'static str = "UpdateBookPrice";

    /// Creates an update that applies to whatever version is current.
    pub fn new(book_id: AggregateId, price: Money) -> Self {
        Self {
            book_id,
            price,
            expected_version: None,
        }
    }

    /// Pins the update to the given book version.
    pub fn at_version(mut self, version: Version) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Commands handled by the [`Book`](super::Book) aggregate.
#[derive(Debug, Clone)]
pub enum BookCommand {
    Create(CreateBook),
    UpdatePrice(UpdateBookPrice),
}

impl TryFrom<Command> for BookCommand {
    type Error = Command;

    fn try_from(command: Command) -> Result<Self, Command> {
        match command {
            Command::CreateBook(c) => Ok(BookCommand::Create(c)),
            Command::UpdateBookPrice(c) => Ok(BookCommand::UpdatePrice(c)),
            other => Err(other),
        }
    }
}

impl AggregateCommand for BookCommand {
    const COMMAND_TYPES: &'static [&'static str] =
        &[CreateBook::COMMAND_TYPE, UpdateBookPrice::COMMAND_TYPE];
}
