//! Value objects carried by orders.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Who placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInformation {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl CustomerInformation {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            address: address.into(),
        }
    }
}

/// One ordered book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub book_id: AggregateId,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn new(
        book_id: impl Into<AggregateId>,
        title: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            book_id: book_id.into(),
            title: title.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the line total (quantity * unit price), or `None` if it
    /// overflows.
    pub fn total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}
