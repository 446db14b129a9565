//! Read models and projections for the admin query side.
//!
//! This crate provides:
//! - [`Projection`] trait for deterministic, replayable read models
//! - [`ProjectionHandle`] that subscribes a projection to published events,
//!   deduplicates redeliveries and publishes immutable snapshots
//! - [`ProjectionEngine`] for registration, catch-up and stale rebuilds
//! - Three views (order list, orders per day, book catalog) and the
//!   [`QueryService`] reading them

pub mod engine;
pub mod error;
pub mod handle;
pub mod projection;
pub mod query;
pub mod views;

pub use engine::ProjectionEngine;
pub use error::{ProjectionError, Result};
pub use handle::ProjectionHandle;
pub use projection::{Projection, ProjectionPosition, ProjectionStatus};
pub use query::QueryService;
pub use views::{BookCatalogView, BookView, OrderListView, OrderView, OrdersPerDayView};
