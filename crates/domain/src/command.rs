//! The closed set of commands accepted by the admin context.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::book::{CreateBook, UpdateBookPrice};
use crate::error::ValidationError;
use crate::order::{ActivateOrder, PlaceOrder};
use crate::publisher_contract::{RegisterPublisherContract, RegisterPurchase};

/// An intent to change the state of exactly one aggregate.
///
/// Commands are transient: they never appear in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Command {
    CreateBook(CreateBook),
    UpdateBookPrice(UpdateBookPrice),
    PlaceOrder(PlaceOrder),
    ActivateOrder(ActivateOrder),
    RegisterPublisherContract(RegisterPublisherContract),
    RegisterPurchase(RegisterPurchase),
}

impl Command {
    /// Returns the tag the command bus routes on.
    pub fn command_type(&self) -> &'static str {
        match self {
            Command::CreateBook(_) => CreateBook::COMMAND_TYPE,
            Command::UpdateBookPrice(_) => UpdateBookPrice::COMMAND_TYPE,
            Command::PlaceOrder(_) => PlaceOrder::COMMAND_TYPE,
            Command::ActivateOrder(_) => ActivateOrder::COMMAND_TYPE,
            Command::RegisterPublisherContract(_) => RegisterPublisherContract::COMMAND_TYPE,
            Command::RegisterPurchase(_) => RegisterPurchase::COMMAND_TYPE,
        }
    }

    /// Returns the id of the aggregate this command targets.
    pub fn aggregate_id(&self) -> &AggregateId {
        match self {
            Command::CreateBook(c) => &c.book_id,
            Command::UpdateBookPrice(c) => &c.book_id,
            Command::PlaceOrder(c) => &c.order_id,
            Command::ActivateOrder(c) => &c.order_id,
            Command::RegisterPublisherContract(c) => &c.contract_id,
            Command::RegisterPurchase(c) => &c.contract_id,
        }
    }

    /// True if the command brings its aggregate into existence.
    ///
    /// Every other command requires the aggregate to have events already.
    pub fn creates_aggregate(&self) -> bool {
        matches!(
            self,
            Command::CreateBook(_) | Command::PlaceOrder(_) | Command::RegisterPublisherContract(_)
        )
    }

    /// The aggregate version the caller based this command on, if it said.
    pub fn expected_version(&self) -> Option<Version> {
        match self {
            Command::UpdateBookPrice(c) => c.expected_version,
            _ => None,
        }
    }

    /// Checks that required fields are present.
    ///
    /// Runs before any store interaction. Business rules that depend on
    /// aggregate state are the aggregate's job.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require(
            self.command_type(),
            "aggregate_id",
            !self.aggregate_id().is_blank(),
        )?;

        match self {
            Command::CreateBook(c) => c.validate(),
            Command::UpdateBookPrice(_) => Ok(()),
            Command::PlaceOrder(c) => c.validate(),
            Command::ActivateOrder(_) => Ok(()),
            Command::RegisterPublisherContract(c) => c.validate(),
            Command::RegisterPurchase(c) => c.validate(),
        }
    }
}

macro_rules! impl_from_command {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Command {
                fn from(command: $variant) -> Self {
                    Command::$variant(command)
                }
            }
        )*
    };
}

impl_from_command!(
    CreateBook,
    UpdateBookPrice,
    PlaceOrder,
    ActivateOrder,
    RegisterPublisherContract,
    RegisterPurchase,
);
