//! Identity types shared by every crate of the bookstore admin core.

mod types;

pub use types::AggregateId;
