#![allow(dead_code)]

use payment_orchestrator::gateways::vnpay::{VnpayAdapter, VnpayConfig};
use payment_orchestrator::orders::client::{
    OrderClient, OrderClientError, OrderPaymentStatus, OrderSummary,
};
use payment_orchestrator::orders::reconciler::OrderReconciler;
use payment_orchestrator::repo::payments_memory::InMemoryPaymentStore;
use payment_orchestrator::service::payment_service::PaymentService;
use payment_orchestrator::service::webhook_processor::WebhookProcessor;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub const HASH_SECRET: &str = "test-hash-secret";
pub const FRONTEND_URL: &str = "http://localhost:5173/payment/result";

pub fn test_adapter() -> VnpayAdapter {
    VnpayAdapter::new(VnpayConfig {
        tmn_code: "TESTTMN1".to_string(),
        hash_secret: HASH_SECRET.to_string(),
        pay_url: "https://gateway.example/pay".to_string(),
        return_url: "http://localhost:3000/payments/return".to_string(),
        locale: "vn".to_string(),
        expire_minutes: 15,
    })
}

pub fn order(id: &str, user_id: &str, amount: i64) -> OrderSummary {
    OrderSummary {
        id: id.to_string(),
        user_id: user_id.to_string(),
        total_amount: amount,
        currency: "VND".to_string(),
        payment_status: "Unpaid".to_string(),
    }
}

/// Order collaborator double: serves canned orders and records every
/// payment-status propagation.
pub struct MockOrderClient {
    orders: Mutex<HashMap<String, OrderSummary>>,
    pub status_calls: Mutex<Vec<(String, OrderPaymentStatus)>>,
    pub fail_status_updates: bool,
}

impl MockOrderClient {
    pub fn new() -> Self {
        MockOrderClient {
            orders: Mutex::new(HashMap::new()),
            status_calls: Mutex::new(Vec::new()),
            fail_status_updates: false,
        }
    }

    pub fn with_order(self, order: OrderSummary) -> Self {
        self.orders.lock().unwrap().insert(order.id.clone(), order);
        self
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl OrderClient for MockOrderClient {
    async fn fetch_order(&self, order_id: &str) -> Result<Option<OrderSummary>, OrderClientError> {
        Ok(self.orders.lock().unwrap().get(order_id).cloned())
    }

    async fn set_payment_status(
        &self,
        order_id: &str,
        status: OrderPaymentStatus,
    ) -> Result<(), OrderClientError> {
        if self.fail_status_updates {
            return Err(OrderClientError::Transport("connection refused".to_string()));
        }
        self.status_calls
            .lock()
            .unwrap()
            .push((order_id.to_string(), status));
        Ok(())
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryPaymentStore>,
    pub orders: Arc<MockOrderClient>,
    pub service: PaymentService,
    pub processor: WebhookProcessor,
}

pub fn fixture(orders: MockOrderClient) -> Fixture {
    let store = Arc::new(InMemoryPaymentStore::new());
    let orders = Arc::new(orders);
    let adapter = test_adapter();
    let service = PaymentService {
        store: store.clone(),
        orders: orders.clone(),
        adapter: adapter.clone(),
    };
    let processor = WebhookProcessor {
        store: store.clone(),
        adapter,
        reconciler: OrderReconciler {
            orders: orders.clone(),
        },
        frontend_return_url: FRONTEND_URL.to_string(),
    };
    Fixture {
        store,
        orders,
        service,
        processor,
    }
}

/// Signs an arbitrary parameter set and serializes it as the gateway
/// would deliver it.
pub fn signed_body(adapter: &VnpayAdapter, pairs: &[(&str, &str)]) -> String {
    let params: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let signature = adapter.codec().sign(&params);

    let mut body = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &params {
        body.append_pair(key, value);
    }
    body.append_pair("vnp_SecureHash", &signature);
    body.finish()
}

/// Builds a complete signed IPN body.
pub fn signed_ipn_body(
    adapter: &VnpayAdapter,
    txn_ref: &str,
    amount_minor: i64,
    response_code: &str,
    txn_status: &str,
) -> String {
    signed_body(
        adapter,
        &[
            ("vnp_TmnCode", "TESTTMN1"),
            ("vnp_TxnRef", txn_ref),
            ("vnp_Amount", &amount_minor.to_string()),
            ("vnp_ResponseCode", response_code),
            ("vnp_TransactionStatus", txn_status),
            ("vnp_TransactionNo", "14422574"),
            ("vnp_BankTranNo", "VNP14422574"),
        ],
    )
}
