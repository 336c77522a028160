use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum OrderClientError {
    #[error("order service request failed: {0}")]
    Transport(String),

    #[error("order service returned a malformed response: {0}")]
    Malformed(String),
}

/// Projection of the order record owned by the order service. Required
/// fields are validated at this boundary; a response missing any of them
/// is rejected as malformed rather than propagated.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub id: String,
    pub user_id: String,
    pub total_amount: i64,
    pub currency: String,
    pub payment_status: String,
}

impl OrderSummary {
    pub fn is_paid(&self) -> bool {
        self.payment_status.eq_ignore_ascii_case("paid")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPaymentStatus {
    Paid,
    Failed,
}

impl OrderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPaymentStatus::Paid => "Paid",
            OrderPaymentStatus::Failed => "Failed",
        }
    }
}

#[async_trait::async_trait]
pub trait OrderClient: Send + Sync {
    async fn fetch_order(&self, order_id: &str) -> Result<Option<OrderSummary>, OrderClientError>;

    async fn set_payment_status(
        &self,
        order_id: &str,
        status: OrderPaymentStatus,
    ) -> Result<(), OrderClientError>;
}

#[derive(Deserialize)]
struct RawOrder {
    id: Option<String>,
    user_id: Option<String>,
    total_amount: Option<i64>,
    currency: Option<String>,
    payment_status: Option<String>,
}

impl RawOrder {
    fn validate(self) -> Result<OrderSummary, OrderClientError> {
        Ok(OrderSummary {
            id: self
                .id
                .ok_or_else(|| OrderClientError::Malformed("missing id".to_string()))?,
            user_id: self
                .user_id
                .ok_or_else(|| OrderClientError::Malformed("missing user_id".to_string()))?,
            total_amount: self
                .total_amount
                .ok_or_else(|| OrderClientError::Malformed("missing total_amount".to_string()))?,
            currency: self
                .currency
                .ok_or_else(|| OrderClientError::Malformed("missing currency".to_string()))?,
            payment_status: self.payment_status.unwrap_or_else(|| "Unpaid".to_string()),
        })
    }
}

/// HTTP client for the order collaborator, authenticated with the shared
/// internal-service credential.
#[derive(Clone)]
pub struct HttpOrderClient {
    pub base_url: String,
    pub api_key: String,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl OrderClient for HttpOrderClient {
    async fn fetch_order(&self, order_id: &str) -> Result<Option<OrderSummary>, OrderClientError> {
        let url = format!("{}/orders/{}", self.base_url, order_id);
        let resp = self
            .client
            .get(&url)
            .header("X-Internal-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| OrderClientError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(OrderClientError::Transport(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }

        let raw: RawOrder = resp
            .json()
            .await
            .map_err(|e| OrderClientError::Malformed(e.to_string()))?;
        raw.validate().map(Some)
    }

    async fn set_payment_status(
        &self,
        order_id: &str,
        status: OrderPaymentStatus,
    ) -> Result<(), OrderClientError> {
        let url = format!("{}/orders/{}/payment-status", self.base_url, order_id);
        let resp = self
            .client
            .patch(&url)
            .header("X-Internal-Api-Key", &self.api_key)
            .json(&serde_json::json!({ "status": status.as_str() }))
            .send()
            .await
            .map_err(|e| OrderClientError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(OrderClientError::Transport(format!(
                "PATCH {url} returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
