//! Publisher contract aggregate: fee accrual on purchases of a publisher's books.

mod aggregate;
mod commands;
mod events;

pub use aggregate::PublisherContract;
pub use commands::{PublisherContractCommand, RegisterPublisherContract, RegisterPurchase};
pub use events::{PublisherContractEvent, PublisherContractRegisteredData, PurchaseRegisteredData};

use thiserror::Error;

use crate::money::Money;

/// Fee percentages are expressed in basis points; 10000 is 100%.
pub const MAX_FEE_BASIS_POINTS: u32 = 10_000;

/// Business rules a publisher contract command can violate.
#[derive(Debug, Error)]
pub enum PublisherContractError {
    #[error("Publisher contract already registered")]
    AlreadyRegistered,

    #[error("Publisher contract is not registered")]
    NotRegistered,

    #[error("Invalid fee: {basis_points} basis points (must be at most {MAX_FEE_BASIS_POINTS})")]
    InvalidFee { basis_points: u32 },

    #[error("Invalid fee limit: {limit} (must be greater than 0)")]
    InvalidFeeLimit { limit: Money },

    #[error("Invalid purchase amount: {amount} (must be greater than 0)")]
    InvalidPurchaseAmount { amount: Money },

    #[error("Fee on purchase amount {amount} overflows")]
    FeeOverflow { amount: Money },
}
