//! Order lifecycle.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// ```text
/// New ──► Placed ──► Activated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// No events yet.
    #[default]
    New,

    /// The customer placed the order; it awaits activation.
    Placed,

    /// An administrator activated the order (terminal state).
    Activated,
}

impl OrderStatus {
    /// Returns true if the order can be placed in this status.
    pub fn can_place(&self) -> bool {
        matches!(self, OrderStatus::New)
    }

    /// Returns true if the order can be activated in this status.
    pub fn can_activate(&self) -> bool {
        matches!(self, OrderStatus::Placed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::Placed => "Placed",
            OrderStatus::Activated => "Activated",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
