//! Publisher contract aggregate implementation.

use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::money::Money;

use super::{
    MAX_FEE_BASIS_POINTS, PublisherContractCommand, PublisherContractError,
    PublisherContractEvent, RegisterPublisherContract, RegisterPurchase,
    events::{PublisherContractRegisteredData, PurchaseRegisteredData},
};

/// A publisher's fee agreement.
///
/// Each purchase accrues `amount * fee / 10000`; the accumulated fee never
/// exceeds the contract's limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublisherContract {
    id: Option<AggregateId>,
    version: Version,
    publisher_name: String,
    fee_basis_points: u32,
    fee_limit: Money,
    accumulated_fee: Money,
}

impl Aggregate for PublisherContract {
    type Event = PublisherContractEvent;
    type Command = PublisherContractCommand;
    type Error = PublisherContractError;

    fn aggregate_type() -> &'static str {
        "PublisherContract"
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
            PublisherContractEvent::PublisherContractRegistered(data) => {
                self.id = Some(data.contract_id);
                self.publisher_name = data.publisher_name;
                self.fee_basis_points = data.fee_basis_points;
                self.fee_limit = data.fee_limit;
            }
            PublisherContractEvent::PurchaseRegistered(data) => {
                self.accumulated_fee = self.accumulated_fee.saturating_add(data.fee);
            }
        }
    }

    fn handle(
        &self,
        command: PublisherContractCommand,
    ) -> Result<Vec<PublisherContractEvent>, PublisherContractError> {
        match command {
            PublisherContractCommand::Register(c) => self.register(c),
            PublisherContractCommand::RegisterPurchase(c) => self.register_purchase(c),
        }
    }
}

impl PublisherContract {
    pub fn publisher_name(&self) -> &str {
        &self.publisher_name
    }

    pub fn fee_basis_points(&self) -> u32 {
        self.fee_basis_points
    }

    pub fn fee_limit(&self) -> Money {
        self.fee_limit
    }

    pub fn accumulated_fee(&self) -> Money {
        self.accumulated_fee
    }

    /// Fee still owed before the limit is reached.
    pub fn remaining_fee(&self) -> Money {
        self.fee_limit.saturating_sub(self.accumulated_fee)
    }

    fn register(
        &self,
        command: RegisterPublisherContract,
    ) -> Result<Vec<PublisherContractEvent>, PublisherContractError> {
        if self.id.is_some() {
            return Err(PublisherContractError::AlreadyRegistered);
        }
        if command.fee_basis_points > MAX_FEE_BASIS_POINTS {
            return Err(PublisherContractError::InvalidFee {
                basis_points: command.fee_basis_points,
            });
        }
        if !command.fee_limit.is_positive() {
            return Err(PublisherContractError::InvalidFeeLimit {
                limit: command.fee_limit,
            });
        }

        Ok(vec![PublisherContractEvent::PublisherContractRegistered(
            PublisherContractRegisteredData {
                contract_id: command.contract_id,
                publisher_name: command.publisher_name,
                fee_basis_points: command.fee_basis_points,
                fee_limit: command.fee_limit,
            },
        )])
    }

    fn register_purchase(
        &self,
        command: RegisterPurchase,
    ) -> Result<Vec<PublisherContractEvent>, PublisherContractError> {
        let Some(id) = &self.id else {
            return Err(PublisherContractError::NotRegistered);
        };
        if !command.amount.is_positive() {
            return Err(PublisherContractError::InvalidPurchaseAmount {
                amount: command.amount,
            });
        }

        let fee = command
            .amount
            .checked_basis_points(self.fee_basis_points)
            .ok_or(PublisherContractError::FeeOverflow {
                amount: command.amount,
            })?
            .min(self.remaining_fee());

        Ok(vec![PublisherContractEvent::PurchaseRegistered(
            PurchaseRegisteredData {
                contract_id: id.clone(),
                product_id: command.product_id,
                amount: command.amount,
                fee,
            },
        )])
    }
}
