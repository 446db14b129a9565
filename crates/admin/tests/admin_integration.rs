//! End-to-end tests through the admin context.

use std::time::Duration;

use admin::{AdminConfig, AdminContext};
use common::AggregateId;
use domain::{
    ActivateOrder, Command, CommandError, CreateBook, CustomerInformation, Money, OrderLine,
    OrderStatus, PlaceOrder, RegisterPublisherContract, RegisterPurchase, UpdateBookPrice,
};
use event_store::Version;
use projections::{BookCatalogView, OrderListView, OrdersPerDayView, Projection};

async fn setup() -> AdminContext {
    AdminContext::bootstrap(AdminConfig::default()).await.unwrap()
}

fn create_book(id: &str, price: i64) -> Command {
    CreateBook {
        book_id: AggregateId::new(id),
        isbn: format!("isbn-{id}"),
        title: format!("Title {id}"),
        description: "A book".to_string(),
        price: Money::from_cents(price),
    }
    .into()
}

fn place_order(id: &str) -> Command {
    PlaceOrder::new(
        AggregateId::new(id),
        CustomerInformation::new("Grace Hopper", "grace@example.com", "Arlington"),
        vec![
            OrderLine::new("B-1", "Title B-1", 1, Money::from_cents(1200)),
            OrderLine::new("B-2", "Title B-2", 3, Money::from_cents(500)),
        ],
    )
    .into()
}

#[tokio::test]
async fn test_bootstrap_registers_everything() {
    let admin = setup().await;

    assert_eq!(
        admin.bus().command_types(),
        vec![
            "ActivateOrder",
            "CreateBook",
            "PlaceOrder",
            "RegisterPublisherContract",
            "RegisterPurchase",
            "UpdateBookPrice",
        ]
    );
    assert_eq!(
        admin.engine().projection_names(),
        vec![
            OrderListView::NAME,
            OrdersPerDayView::NAME,
            BookCatalogView::NAME
        ]
    );
    assert!(admin.projection_status().iter().all(|s| !s.stale));
    assert!(admin.event_log().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_book_price_update_end_to_end() {
    let admin = setup().await;
    let b1 = AggregateId::new("B-1");

    let created = admin.dispatch(create_book("B-1", 1000)).await.unwrap();
    assert_eq!(created.new_version, Version::first());

    let updated = admin
        .dispatch(
            UpdateBookPrice::new(b1.clone(), Money::from_cents(1200))
                .at_version(Version::first())
                .into(),
        )
        .await
        .unwrap();
    assert_eq!(updated.new_version, Version::new(2));

    let stale = admin
        .dispatch(
            UpdateBookPrice::new(b1.clone(), Money::from_cents(1300))
                .at_version(Version::first())
                .into(),
        )
        .await;
    assert!(matches!(
        stale,
        Err(CommandError::ConcurrencyConflict { attempts: 1, .. })
    ));

    admin.settled().await;
    let book = admin.queries().get_book(&b1).unwrap();
    assert_eq!(book.price, Money::from_cents(1200));
    assert_eq!(book.version, Version::new(2));

    let log = admin.event_log().await.unwrap();
    let types: Vec<_> = log.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["BookCreated", "BookPriceUpdated"]);
}

#[tokio::test]
async fn test_orders_flow_into_queries() {
    let admin = setup().await;

    admin.dispatch(create_book("B-1", 1200)).await.unwrap();
    admin.dispatch(place_order("O-1")).await.unwrap();
    admin.dispatch(place_order("O-2")).await.unwrap();
    admin
        .dispatch(ActivateOrder::new(AggregateId::new("O-1")).into())
        .await
        .unwrap();
    admin.settled().await;

    let o1 = admin.queries().get_order(&AggregateId::new("O-1")).unwrap();
    assert_eq!(o1.status, OrderStatus::Activated);
    assert_eq!(o1.order_amount, Money::from_cents(2700));
    assert_eq!(o1.customer_name, "Grace Hopper");

    let o2 = admin.queries().get_order(&AggregateId::new("O-2")).unwrap();
    assert_eq!(o2.status, OrderStatus::Placed);

    assert_eq!(admin.queries().list_orders().len(), 2);
    assert_eq!(admin.queries().orders_per_day().values().sum::<u32>(), 2);

    let activating_again = admin
        .dispatch(ActivateOrder::new(AggregateId::new("O-1")).into())
        .await;
    assert!(matches!(
        activating_again,
        Err(CommandError::BusinessRuleViolation { .. })
    ));
}

#[tokio::test]
async fn test_event_log_follows_append_order() {
    let admin = setup().await;
    let contract = AggregateId::new("C-1");

    admin.dispatch(create_book("B-1", 1000)).await.unwrap();
    admin
        .dispatch(
            RegisterPublisherContract {
                contract_id: contract.clone(),
                publisher_name: "MIT Press".to_string(),
                fee_basis_points: 1000,
                fee_limit: Money::from_cents(5000),
            }
            .into(),
        )
        .await
        .unwrap();
    admin.dispatch(place_order("O-1")).await.unwrap();
    let purchase = admin
        .dispatch(
            RegisterPurchase {
                contract_id: contract.clone(),
                product_id: AggregateId::new("B-1"),
                amount: Money::from_cents(10_000),
            }
            .into(),
        )
        .await
        .unwrap();
    assert_eq!(purchase.new_version, Version::new(2));

    let log = admin.event_log().await.unwrap();
    let types: Vec<_> = log.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "BookCreated",
            "PublisherContractRegistered",
            "OrderPlaced",
            "PurchaseRegistered",
        ]
    );
    assert!(log[1].description.contains("C-1"));
}

#[tokio::test]
async fn test_configuration_reaches_the_bus() {
    let config = AdminConfig {
        max_retries: 0,
        retry_backoff: Duration::from_millis(1),
        dispatch_timeout: Duration::from_millis(250),
        ..AdminConfig::default()
    };
    let admin = AdminContext::bootstrap(config.clone()).await.unwrap();

    assert_eq!(admin.config(), &config);
    assert_eq!(admin.bus().config(), &config.bus_config());
}

#[tokio::test]
async fn test_healthy_projections_need_no_rebuild() {
    let admin = setup().await;
    admin.dispatch(create_book("B-1", 1000)).await.unwrap();
    admin.settled().await;

    assert!(admin.rebuild_stale().await.unwrap().is_empty());
    assert!(admin.projection_status().iter().all(|s| s.events_processed == 1));
}
