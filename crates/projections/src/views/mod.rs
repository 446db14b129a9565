//! Read model views for the admin query side.

pub mod book_catalog;
pub mod order_list;
pub mod orders_per_day;

pub use book_catalog::{BookCatalogView, BookView};
pub use order_list::{OrderListView, OrderView};
pub use orders_per_day::OrdersPerDayView;

#[cfg(test)]
pub(crate) mod testing {
    use common::AggregateId;
    use domain::{Aggregate, DomainEvent};
    use event_store::{EventEnvelope, Version};

    pub fn envelope<A: Aggregate>(id: &str, version: u64, event: &A::Event) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(AggregateId::new(id))
            .aggregate_type(A::aggregate_type())
            .event_type(event.event_type())
            .version(Version::new(version))
            .payload(event)
            .unwrap()
            .build()
            .unwrap()
    }
}
