//! Publisher contract commands.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateCommand;
use crate::command::Command;
use crate::error::ValidationError;
use crate::money::Money;

/// Command to register a contract with a publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPublisherContract {
    pub contract_id: AggregateId,
    pub publisher_name: String,

    /// Share of each purchase owed to the publisher, in basis points.
    pub fee_basis_points: u32,

    /// Upper bound on the fee accumulated over the contract's lifetime.
    pub fee_limit: Money,
}

impl RegisterPublisherContract {
    pub const COMMAND_TYPE: &'static str = "RegisterPublisherContract";

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require(
            Self::COMMAND_TYPE,
            "publisher_name",
            !self.publisher_name.trim().is_empty(),
        )
    }
}

/// Command to record a purchase of one of the publisher's products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPurchase {
    pub contract_id: AggregateId,
    pub product_id: AggregateId,
    pub amount: Money,
}

impl RegisterPurchase {
    pub const COMMAND_TYPE: &'static str = "RegisterPurchase";

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require(Self::COMMAND_TYPE, "product_id", !self.product_id.is_blank())
    }
}

/// Commands handled by the [`PublisherContract`](super::PublisherContract) aggregate.
#[derive(Debug, Clone)]
pub enum PublisherContractCommand {
    Register(RegisterPublisherContract),
    RegisterPurchase(RegisterPurchase),
}

impl TryFrom<Command> for PublisherContractCommand {
    type Error = Command;

    fn try_from(command: Command) -> Result<Self, Command> {
        match command {
            Command::RegisterPublisherContract(c) => Ok(PublisherContractCommand::Register(c)),
            Command::RegisterPurchase(c) => Ok(PublisherContractCommand::RegisterPurchase(c)),
            other => Err(other),
        }
    }
}

impl AggregateCommand for PublisherContractCommand {
    const COMMAND_TYPES: &'static [&'static str] = &[
        RegisterPublisherContract::COMMAND_TYPE,
        RegisterPurchase::COMMAND_TYPE,
    ];
}
