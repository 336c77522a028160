use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use payment_orchestrator::config::AppConfig;
use payment_orchestrator::gateways::vnpay::VnpayAdapter;
use payment_orchestrator::orders::client::HttpOrderClient;
use payment_orchestrator::orders::reconciler::OrderReconciler;
use payment_orchestrator::repo::payments_pg::PgPaymentStore;
use payment_orchestrator::service::payment_service::PaymentService;
use payment_orchestrator::service::webhook_processor::WebhookProcessor;
use payment_orchestrator::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgPaymentStore { pool });
    let orders = Arc::new(HttpOrderClient {
        base_url: cfg.order_service_url.clone(),
        api_key: cfg.internal_api_key.clone(),
        client: reqwest::Client::new(),
    });
    let adapter = VnpayAdapter::new(cfg.vnpay());

    let payment_service = PaymentService {
        store: store.clone(),
        orders: orders.clone(),
        adapter: adapter.clone(),
    };
    let webhook_processor = WebhookProcessor {
        store,
        adapter,
        reconciler: OrderReconciler { orders },
        frontend_return_url: cfg.frontend_return_url.clone(),
    };

    let state = AppState {
        payment_service,
        webhook_processor,
    };

    let admin_key = cfg.internal_api_key.clone();
    let admin_routes = Router::new()
        .route(
            "/admin/payments/:payment_id/refund",
            post(payment_orchestrator::http::handlers::payments::refund_payment),
        )
        .route(
            "/admin/payments/:payment_id/cancel",
            post(payment_orchestrator::http::handlers::payments::cancel_payment),
        )
        .layer(from_fn_with_state(
            admin_key,
            payment_orchestrator::http::middleware::admin_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route("/health", get(payment_orchestrator::http::handlers::payments::health))
        .route(
            "/payments/initiate",
            post(payment_orchestrator::http::handlers::payments::initiate_payment),
        )
        .route(
            "/payments",
            get(payment_orchestrator::http::handlers::payments::list_payments),
        )
        .route(
            "/payments/stats",
            get(payment_orchestrator::http::handlers::payments::payment_stats),
        )
        .route(
            "/payments/webhook",
            post(payment_orchestrator::http::handlers::webhook::ipn),
        )
        .route(
            "/payments/return",
            get(payment_orchestrator::http::handlers::webhook::payment_return),
        )
        .route(
            "/payments/:payment_id",
            get(payment_orchestrator::http::handlers::payments::get_payment),
        )
        .merge(admin_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
