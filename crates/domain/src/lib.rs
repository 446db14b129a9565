//! Write side of the bookstore admin core.
//!
//! This crate provides:
//! - [`Aggregate`] and [`DomainEvent`] contracts for event-sourced state
//! - the closed [`Command`] set accepted by the admin context
//! - [`CommandBus`], routing commands through an explicit handler registry
//! - Book, Order and PublisherContract aggregates

pub mod aggregate;
pub mod book;
pub mod bus;
pub mod command;
pub mod error;
pub mod money;
pub mod order;
pub mod publisher_contract;

pub use aggregate::{Aggregate, AggregateCommand, DomainEvent};
pub use book::{Book, BookCommand, BookError, BookEvent, CreateBook, UpdateBookPrice};
pub use bus::{BusConfig, CommandBus, CommandBusBuilder, DispatchReceipt};
pub use command::Command;
pub use error::{CommandError, ValidationError};
pub use money::Money;
pub use order::{
    ActivateOrder, CustomerInformation, Order, OrderCommand, OrderError, OrderEvent, OrderLine,
    OrderStatus, PlaceOrder,
};
pub use publisher_contract::{
    PublisherContract, PublisherContractCommand, PublisherContractError, PublisherContractEvent,
    RegisterPublisherContract, RegisterPurchase,
};
