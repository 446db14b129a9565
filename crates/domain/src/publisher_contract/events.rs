//! Publisher contract domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PublisherContractEvent {
    PublisherContractRegistered(PublisherContractRegisteredData),
    PurchaseRegistered(PurchaseRegisteredData),
}

impl PublisherContractEvent {
    pub const REGISTERED: &'static str = "PublisherContractRegistered";
    pub const PURCHASE_REGISTERED: &'static str = "PurchaseRegistered";
}

impl DomainEvent for PublisherContractEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PublisherContractEvent::PublisherContractRegistered(_) => Self::REGISTERED,
            PublisherContractEvent::PurchaseRegistered(_) => Self::PURCHASE_REGISTERED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherContractRegisteredData {
    pub contract_id: AggregateId,
    pub publisher_name: String,
    pub fee_basis_points: u32,
    pub fee_limit: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRegisteredData {
    pub contract_id: AggregateId,
    pub product_id: AggregateId,
    pub amount: Money,

    /// Fee accrued by this purchase, after capping at the limit.
    pub fee: Money,
}
