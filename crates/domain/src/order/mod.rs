//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::{ActivateOrder, OrderCommand, PlaceOrder};
pub use events::{OrderActivatedData, OrderEvent, OrderPlacedData};
pub use state::OrderStatus;
pub use value_objects::{CustomerInformation, OrderLine};

use common::AggregateId;
use thiserror::Error;

use crate::money::Money;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is not in the expected status.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidStateTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Invalid quantity.
    #[error("Invalid quantity for {book_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { book_id: AggregateId, quantity: u32 },

    /// Invalid price.
    #[error("Invalid unit price for {book_id}: {price} (must not be negative)")]
    InvalidPrice { book_id: AggregateId, price: Money },

    /// Order has no lines.
    #[error("Order has no lines")]
    NoLines,

    /// The order total does not fit in a money amount.
    #[error("Order amount overflows")]
    AmountOverflow,
}
