//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::money::Money;

use super::{
    ActivateOrder, CustomerInformation, OrderCommand, OrderError, OrderEvent, OrderLine,
    OrderStatus, PlaceOrder,
    events::{OrderActivatedData, OrderPlacedData},
};

/// Order aggregate root.
///
/// Tracks an order from placement to activation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    id: Option<AggregateId>,
    version: Version,
    status: OrderStatus,
    customer: Option<CustomerInformation>,
    lines: Vec<OrderLine>,
    order_amount: Money,
    placed_at: Option<DateTime<Utc>>,
    activated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
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
            OrderEvent::OrderPlaced(data) => {
                self.id = Some(data.order_id);
                self.status = OrderStatus::Placed;
                self.customer = Some(data.customer);
                self.lines = data.lines;
                self.order_amount = data.order_amount;
                self.placed_at = Some(data.placed_at);
            }
            OrderEvent::OrderActivated(data) => {
                self.status = OrderStatus::Activated;
                self.activated_at = Some(data.activated_at);
            }
        }
    }

    fn handle(&self, command: OrderCommand) -> Result<Vec<OrderEvent>, OrderError> {
        match command {
            OrderCommand::Place(c) => self.place(c),
            OrderCommand::Activate(c) => self.activate(c),
        }
    }
}

// Query methods
impl Order {
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn customer(&self) -> Option<&CustomerInformation> {
        self.customer.as_ref()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn order_amount(&self) -> Money {
        self.order_amount
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }
}

// Command methods (return events)
impl Order {
    fn place(&self, command: PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_place() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "place",
            });
        }
        if command.lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        for line in &command.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    book_id: line.book_id.clone(),
                    quantity: line.quantity,
                });
            }
            if line.unit_price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    book_id: line.book_id.clone(),
                    price: line.unit_price,
                });
            }
        }

        let order_amount = command
            .lines
            .iter()
            .map(OrderLine::total)
            .try_fold(Money::zero(), |total, line| total.checked_add(line?))
            .ok_or(OrderError::AmountOverflow)?;
        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: command.order_id,
            customer: command.customer,
            lines: command.lines,
            order_amount,
            placed_at: command.placed_at,
        })])
    }

    fn activate(&self, command: ActivateOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_activate() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "activate",
            });
        }

        Ok(vec![OrderEvent::OrderActivated(OrderActivatedData {
            order_id: command.order_id,
            activated_at: command.activated_at,
        })])
    }
}
