//! Metrics recorded through the admin context.

use std::sync::OnceLock;

use admin::{AdminConfig, AdminContext, telemetry};
use common::AggregateId;
use domain::{CreateBook, Money, UpdateBookPrice};
use metrics_exporter_prometheus::PrometheusHandle;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            telemetry::install_metrics().expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn sample(rendered: &str, name: &str) -> Option<u64> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| line.strip_prefix(name)?.strip_prefix(' ')?.parse().ok())
}

#[tokio::test]
async fn test_counters_are_rendered() {
    let handle = get_metrics_handle();
    let admin = AdminContext::bootstrap(AdminConfig::default()).await.unwrap();
    let b1 = AggregateId::new("B-1");

    admin
        .dispatch(
            CreateBook {
                book_id: b1.clone(),
                isbn: "isbn-B-1".to_string(),
                title: "Title B-1".to_string(),
                description: String::new(),
                price: Money::from_cents(1000),
            }
            .into(),
        )
        .await
        .unwrap();
    admin
        .dispatch(UpdateBookPrice::new(b1, Money::from_cents(1200)).into())
        .await
        .unwrap();
    assert!(admin.settled().await.is_empty());

    let rendered = handle.render();
    assert_eq!(sample(&rendered, "event_store_events_appended"), Some(2));
    assert_eq!(sample(&rendered, "projections_rebuilds"), Some(3));
    // Every registered projection tracks both events.
    assert_eq!(sample(&rendered, "projections_events_processed"), Some(6));
}
