//! Orders placed per UTC day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use domain::OrderEvent;
use event_store::EventEnvelope;

use crate::Result;
use crate::projection::Projection;

/// Number of orders placed on each day, bucketed by the order's own
/// placement timestamp so replays land in the same buckets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersPerDayView {
    counts: BTreeMap<NaiveDate, u32>,
}

impl OrdersPerDayView {
    pub fn orders_per_day(&self) -> BTreeMap<NaiveDate, u32> {
        self.counts.clone()
    }

    pub fn orders_on(&self, day: NaiveDate) -> u32 {
        self.counts.get(&day).copied().unwrap_or(0)
    }
}

impl Projection for OrdersPerDayView {
    const NAME: &'static str = "OrdersPerDayView";
    const EVENT_TYPES: &'static [&'static str] = &[OrderEvent::PLACED];

    fn apply(&mut self, event: &EventEnvelope) -> Result<()> {
        let event: OrderEvent = serde_json::from_value(event.payload.clone())?;
        if let OrderEvent::OrderPlaced(data) = event {
            *self.counts.entry(data.placed_at.date_naive()).or_default() += 1;
        }
        Ok(())
    }
}
