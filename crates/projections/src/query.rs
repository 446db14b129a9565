//! Read API over the admin projections.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use common::AggregateId;

use crate::handle::ProjectionHandle;
use crate::views::{BookCatalogView, BookView, OrderListView, OrderView, OrdersPerDayView};

/// Answers admin queries from projection snapshots.
///
/// Every method copies out of the latest published snapshot: it never
/// waits on event processing and never replays the log.
#[derive(Clone)]
pub struct QueryService {
    orders: Arc<ProjectionHandle<OrderListView>>,
    orders_per_day: Arc<ProjectionHandle<OrdersPerDayView>>,
    books: Arc<ProjectionHandle<BookCatalogView>>,
}

impl QueryService {
    pub fn new(
        orders: Arc<ProjectionHandle<OrderListView>>,
        orders_per_day: Arc<ProjectionHandle<OrdersPerDayView>>,
        books: Arc<ProjectionHandle<BookCatalogView>>,
    ) -> Self {
        Self {
            orders,
            orders_per_day,
            books,
        }
    }

    pub fn list_orders(&self) -> Vec<OrderView> {
        let orders = self.orders.snapshot().list_orders();
        tracing::debug!(orders = orders.len(), "returning orders");
        orders
    }

    pub fn get_order(&self, order_id: &AggregateId) -> Option<OrderView> {
        self.orders.snapshot().get_order(order_id).cloned()
    }

    pub fn orders_per_day(&self) -> BTreeMap<NaiveDate, u32> {
        self.orders_per_day.snapshot().orders_per_day()
    }

    pub fn get_book(&self, book_id: &AggregateId) -> Option<BookView> {
        self.books.snapshot().get_book(book_id).cloned()
    }

    pub fn list_books(&self) -> Vec<BookView> {
        self.books.snapshot().list_books()
    }
}
