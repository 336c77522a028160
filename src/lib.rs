pub mod config;
pub mod error;
pub mod signature;
pub mod domain {
    pub mod payment;
    pub mod transition;
}
pub mod gateways;
pub mod orders {
    pub mod client;
    pub mod reconciler;
}
pub mod repo {
    pub mod payment_store;
    pub mod payments_memory;
    pub mod payments_pg;
}
pub mod service {
    pub mod payment_service;
    pub mod webhook_processor;
}
pub mod http {
    pub mod handlers {
        pub mod payments;
        pub mod webhook;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
}

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
    pub webhook_processor: service::webhook_processor::WebhookProcessor,
}
