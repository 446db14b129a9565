//! Order commands.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateCommand;
use crate::command::Command;
use crate::error::ValidationError;

use super::{CustomerInformation, OrderLine};

/// Command to place a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: AggregateId,
    pub customer: CustomerInformation,
    pub lines: Vec<OrderLine>,
    pub placed_at: DateTime<Utc>,
}

impl PlaceOrder {
    pub const COMMAND_TYPE: &'static str = "PlaceOrder";

    /// Creates a PlaceOrder command stamped with the current time.
    pub fn new(
        order_id: AggregateId,
        customer: CustomerInformation,
        lines: Vec<OrderLine>,
    ) -> Self {
        Self {
            order_id,
            customer,
            lines,
            placed_at: Utc::now(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require(
            Self::COMMAND_TYPE,
            "customer.name",
            !self.customer.name.trim().is_empty(),
        )?;
        ValidationError::require(
            Self::COMMAND_TYPE,
            "lines.book_id",
            self.lines.iter().all(|line| !line.book_id.is_blank()),
        )
    }
}

/// Command to activate a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivateOrder {
    pub order_id: AggregateId,
    pub activated_at: DateTime<Utc>,
}

impl ActivateOrder {
    pub const COMMAND_TYPE: &'static str = "ActivateOrder";

    /// Creates an ActivateOrder command stamped with the current time.
    pub fn new(order_id: AggregateId) -> Self {
        Self {
            order_id,
            activated_at: Utc::now(),
        }
    }
}

/// Commands handled by the [`Order`](super::Order) aggregate.
#[derive(Debug, Clone)]
pub enum OrderCommand {
    Place(PlaceOrder),
    Activate(ActivateOrder),
}

impl TryFrom<Command> for OrderCommand {
    type Error = Command;

    fn try_from(command: Command) -> Result<Self, Command> {
        match command {
            Command::PlaceOrder(c) => Ok(OrderCommand::Place(c)),
            Command::ActivateOrder(c) => Ok(OrderCommand::Activate(c)),
            other => Err(other),
        }
    }
}

impl AggregateCommand for OrderCommand {
    const COMMAND_TYPES: &'static [&'static str] =
        &[PlaceOrder::COMMAND_TYPE, ActivateOrder::COMMAND_TYPE];
}
