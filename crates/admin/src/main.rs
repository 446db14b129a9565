//! Admin entry point: boots the core, runs a sample workload and prints the
//! resulting event log followed by the recorded metrics.

use std::error::Error;

use admin::{AdminConfig, AdminContext, telemetry};
use common::AggregateId;
use domain::{
    ActivateOrder, CreateBook, CustomerInformation, Money, OrderLine, PlaceOrder, UpdateBookPrice,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 1. Configuration, tracing and metrics
    let config = AdminConfig::from_env()?;
    telemetry::init_tracing(&config)?;
    let metrics = telemetry::install_metrics()?;

    // 2. Wire store, bus and projections
    let admin = AdminContext::bootstrap(config).await?;

    // 3. Sample workload
    let book_id = AggregateId::new("B-1");
    admin
        .dispatch(
            CreateBook {
                book_id: book_id.clone(),
                isbn: "978-0262510875".to_string(),
                title: "Structure and Interpretation of Computer Programs".to_string(),
                description: "Second edition".to_string(),
                price: Money::from_cents(1000),
            }
            .into(),
        )
        .await?;
    let updated = admin
        .dispatch(UpdateBookPrice::new(book_id.clone(), Money::from_cents(1200)).into())
        .await?;
    tracing::info!(version = %updated.new_version, "price updated");

    let order_id = AggregateId::generate();
    admin
        .dispatch(
            PlaceOrder::new(
                order_id.clone(),
                CustomerInformation::new("Ada Lovelace", "ada@example.com", "12 St James's Square"),
                vec![OrderLine::new(book_id.clone(), "SICP", 2, Money::from_cents(1200))],
            )
            .into(),
        )
        .await?;
    admin.dispatch(ActivateOrder::new(order_id).into()).await?;

    // 4. Report
    let stopped = admin.settled().await;
    if !stopped.is_empty() {
        tracing::error!(subscribers = ?stopped, "projection workers stopped");
    }
    for order in admin.queries().list_orders() {
        tracing::info!(
            order_id = %order.order_id,
            amount = %order.order_amount,
            status = %order.status,
            "order"
        );
    }

    let log = admin.event_log().await?;
    println!("{}", serde_json::to_string_pretty(&log)?);
    println!("{}", metrics.render());

    Ok(())
}
