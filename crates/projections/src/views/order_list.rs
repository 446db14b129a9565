//! Order list read model: one row per placed order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Money, OrderEvent, OrderLine, OrderStatus};
use event_store::EventEnvelope;
use serde::Serialize;

use crate::projection::Projection;
use crate::{ProjectionError, Result};

/// Denormalized order row for the admin order list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub order_id: AggregateId,
    pub placed_at: DateTime<Utc>,
    pub customer_name: String,
    pub order_amount: Money,
    pub lines: Vec<OrderLine>,
    pub status: OrderStatus,
    pub activated_at: Option<DateTime<Utc>>,
}

/// All orders, keyed by order id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderListView {
    orders: BTreeMap<AggregateId, OrderView>,
}

impl OrderListView {
    pub fn get_order(&self, order_id: &AggregateId) -> Option<&OrderView> {
        self.orders.get(order_id)
    }

    /// Returns every order, oldest placement first; ties broken by id.
    pub fn list_orders(&self) -> Vec<OrderView> {
        let mut orders: Vec<_> = self.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            a.placed_at
                .cmp(&b.placed_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl Projection for OrderListView {
    const NAME: &'static str = "OrderListView";
    const EVENT_TYPES: &'static [&'static str] = &[OrderEvent::PLACED, OrderEvent::ACTIVATED];

    fn apply(&mut self, event: &EventEnvelope) -> Result<()> {
        match serde_json::from_value::<OrderEvent>(event.payload.clone())? {
            OrderEvent::OrderPlaced(data) => {
                self.orders.insert(
                    data.order_id.clone(),
                    OrderView {
                        order_id: data.order_id,
                        placed_at: data.placed_at,
                        customer_name: data.customer.name,
                        order_amount: data.order_amount,
                        lines: data.lines,
                        status: OrderStatus::Placed,
                        activated_at: None,
                    },
                );
            }
            OrderEvent::OrderActivated(data) => {
                let order = self.orders.get_mut(&data.order_id).ok_or_else(|| {
                    ProjectionError::Projection(format!(
                        "activation of unknown order {}",
                        data.order_id
                    ))
                })?;
                order.status = OrderStatus::Activated;
                order.activated_at = Some(data.activated_at);
            }
        }
        Ok(())
    }
}
