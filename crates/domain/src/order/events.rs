//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;

use super::{CustomerInformation, OrderLine};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed by a customer.
    OrderPlaced(OrderPlacedData),

    /// Order was activated.
    OrderActivated(OrderActivatedData),
}

impl OrderEvent {
    pub const PLACED: &'static str = "OrderPlaced";
    pub const ACTIVATED: &'static str = "OrderActivated";
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => Self::PLACED,
            OrderEvent::OrderActivated(_) => Self::ACTIVATED,
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub customer: CustomerInformation,
    pub lines: Vec<OrderLine>,

    /// Sum of all line totals.
    pub order_amount: Money,

    /// When the customer placed the order.
    pub placed_at: DateTime<Utc>,
}

/// Data for OrderActivated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderActivatedData {
    pub order_id: AggregateId,
    pub activated_at: DateTime<Utc>,
}
