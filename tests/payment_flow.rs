mod common;

use common::{fixture, order, MockOrderClient};
use payment_orchestrator::domain::payment::{
    InitiatePaymentRequest, PaymentGatewayKind, PaymentStatus,
};
use payment_orchestrator::error::PaymentError;
use payment_orchestrator::repo::payment_store::{ListFilter, PaymentStore, StatsFilter};

fn initiate_request(order_id: &str) -> InitiatePaymentRequest {
    InitiatePaymentRequest {
        order_id: order_id.to_string(),
        gateway: None,
        bank_code: None,
        ip_addr: None,
        user_id: None,
    }
}

#[tokio::test]
async fn initiate_creates_processing_payment_with_redirect() {
    let fx = fixture(MockOrderClient::new().with_order(order("O1", "alice", 100_000)));

    let resp = fx
        .service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();

    assert!(resp.success);
    assert_eq!(resp.status, PaymentStatus::Processing);
    assert!(resp.payment_url.contains("vnp_TxnRef"));

    let stored = fx.store.find_by_id(resp.payment_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Processing);
    assert_eq!(stored.order_id, "O1");
    assert_eq!(stored.user_id, "alice");
    assert_eq!(stored.amount, 100_000);
    assert_eq!(stored.redirect_url.as_deref(), Some(resp.payment_url.as_str()));
}

#[tokio::test]
async fn second_initiate_reuses_active_payment() {
    let fx = fixture(MockOrderClient::new().with_order(order("O1", "alice", 100_000)));

    let first = fx
        .service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();
    let second = fx
        .service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();

    assert_eq!(first.payment_id, second.payment_id);
    assert_eq!(first.payment_url, second.payment_url);

    let page = fx.store.list(&ListFilter { page: 1, limit: 10, ..Default::default() }).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn concurrent_initiations_collapse_into_one_payment() {
    let fx = fixture(MockOrderClient::new().with_order(order("O1", "alice", 100_000)));

    let (a, b) = tokio::join!(
        fx.service
            .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string()),
        fx.service
            .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.2".to_string()),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.payment_id, b.payment_id);
    assert_eq!(a.payment_url, b.payment_url);

    let page = fx.store.list(&ListFilter { page: 1, limit: 10, ..Default::default() }).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].status, PaymentStatus::Processing);
}

#[tokio::test]
async fn initiate_rejects_unknown_order() {
    let fx = fixture(MockOrderClient::new());
    let err = fx
        .service
        .initiate(initiate_request("missing"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::OrderNotFound));
}

#[tokio::test]
async fn initiate_enforces_order_ownership() {
    let fx = fixture(MockOrderClient::new().with_order(order("O1", "alice", 100_000)));
    let err = fx
        .service
        .initiate(initiate_request("O1"), Some("bob".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden(_)));
    assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn initiate_rejects_already_paid_order() {
    let mut paid = order("O1", "alice", 100_000);
    paid.payment_status = "Paid".to_string();
    let fx = fixture(MockOrderClient::new().with_order(paid));

    let err = fx
        .service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::OrderAlreadyPaid));
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn initiate_rejects_non_positive_amount_without_creating_payment() {
    let fx = fixture(MockOrderClient::new().with_order(order("O1", "alice", 0)));

    let err = fx
        .service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidAmount));
    assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

    let page = fx.store.list(&ListFilter { page: 1, limit: 10, ..Default::default() }).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn initiate_falls_back_to_client_supplied_user() {
    let fx = fixture(MockOrderClient::new().with_order(order("O1", "alice", 100_000)));
    let mut req = initiate_request("O1");
    req.user_id = Some("alice".to_string());

    let resp = fx.service.initiate(req, None, "10.0.0.1".to_string()).await.unwrap();
    assert_eq!(resp.status, PaymentStatus::Processing);
}

#[tokio::test]
async fn get_status_enforces_ownership() {
    let fx = fixture(MockOrderClient::new().with_order(order("O1", "alice", 100_000)));
    let resp = fx
        .service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();

    let ok = fx
        .service
        .get_status(resp.payment_id, Some("alice"))
        .await
        .unwrap();
    assert_eq!(ok.id, resp.payment_id);

    let err = fx
        .service
        .get_status(resp.payment_id, Some("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden(_)));
}

#[tokio::test]
async fn list_paginates_across_pages_without_overlap() {
    let fx = fixture(
        MockOrderClient::new()
            .with_order(order("O1", "alice", 100_000))
            .with_order(order("O2", "alice", 200_000))
            .with_order(order("O3", "alice", 300_000)),
    );
    for order_id in ["O1", "O2", "O3"] {
        fx.service
            .initiate(initiate_request(order_id), Some("alice".to_string()), "10.0.0.1".to_string())
            .await
            .unwrap();
    }

    let first = fx
        .store
        .list(&ListFilter { page: 1, limit: 2, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.total, 3);

    let second = fx
        .store
        .list(&ListFilter { page: 2, limit: 2, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.total, 3);
    assert!(first.items.iter().all(|p| p.id != second.items[0].id));
}

#[tokio::test]
async fn list_filters_by_status_gateway_and_user() {
    let fx = fixture(
        MockOrderClient::new()
            .with_order(order("O1", "alice", 100_000))
            .with_order(order("O2", "alice", 200_000)),
    );
    fx.service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();
    let second = fx
        .service
        .initiate(initiate_request("O2"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();
    fx.service.cancel(second.payment_id).await.unwrap();

    let processing = fx
        .store
        .list(&ListFilter {
            status: Some(PaymentStatus::Processing),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(processing.total, 1);
    assert_eq!(processing.items[0].order_id, "O1");

    let cancelled = fx
        .store
        .list(&ListFilter {
            status: Some(PaymentStatus::Cancelled),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cancelled.total, 1);
    assert_eq!(cancelled.items[0].order_id, "O2");

    let by_gateway = fx
        .store
        .list(&ListFilter {
            gateway: Some(PaymentGatewayKind::Vnpay),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_gateway.total, 2);

    let other_user = fx
        .store
        .list(&ListFilter {
            user_id: Some("bob".to_string()),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(other_user.total, 0);
}

#[tokio::test]
async fn stats_respect_created_at_window_bounds() {
    let fx = fixture(MockOrderClient::new().with_order(order("O1", "alice", 100_000)));
    fx.service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();
    let now = chrono::Utc::now();

    // Window ending before the payment was created excludes it.
    let before = fx
        .service
        .stats(StatsFilter {
            end: Some(now - chrono::Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(before.by_status.is_empty());

    // Window starting before and still open includes it.
    let covering = fx
        .service
        .stats(StatsFilter {
            start: Some(now - chrono::Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(covering.by_status.len(), 1);
    assert_eq!(covering.by_status[0].count, 1);

    // Window starting after excludes it again.
    let after = fx
        .service
        .stats(StatsFilter {
            start: Some(now + chrono::Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(after.by_status.is_empty());
}

#[tokio::test]
async fn stats_aggregate_by_status_and_gateway() {
    let fx = fixture(
        MockOrderClient::new()
            .with_order(order("O1", "alice", 100_000))
            .with_order(order("O2", "alice", 250_000)),
    );
    fx.service
        .initiate(initiate_request("O1"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();
    fx.service
        .initiate(initiate_request("O2"), Some("alice".to_string()), "10.0.0.1".to_string())
        .await
        .unwrap();

    let stats = fx.service.stats(StatsFilter::default()).await.unwrap();
    assert_eq!(stats.by_status.len(), 1);
    assert_eq!(stats.by_status[0].status, PaymentStatus::Processing);
    assert_eq!(stats.by_status[0].count, 2);
    assert_eq!(stats.by_status[0].total_amount, 350_000);
    assert_eq!(stats.by_gateway.len(), 1);
    assert_eq!(stats.by_gateway[0].count, 2);
}
