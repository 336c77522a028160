use crate::gateways::{
    GatewayError, GatewayNotification, Interpretation, PaymentOutcome, RedirectRequest,
};
use crate::signature::SignatureCodec;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::collections::BTreeMap;

pub const PROTOCOL_VERSION: &str = "2.1.0";

const COMMAND_PAY: &str = "pay";
const CURRENCY_CODE: &str = "VND";
const SIGNATURE_FIELD: &str = "vnp_SecureHash";
const SIGNATURE_TYPE_FIELD: &str = "vnp_SecureHashType";
const MAX_TXN_REF_LEN: usize = 100;
const DATE_FORMAT: &str = "%Y%m%d%H%M%S";

// The gateway requires all timestamps in Indochina time (UTC+7).
const GATEWAY_UTC_OFFSET_SECS: i32 = 7 * 3600;

#[derive(Clone)]
pub struct VnpayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    pub pay_url: String,
    pub return_url: String,
    pub locale: String,
    pub expire_minutes: i64,
}

/// Adapter for the hosted-page gateway protocol: builds signed redirect
/// URLs and decodes signed notifications into a terminal outcome.
#[derive(Clone)]
pub struct VnpayAdapter {
    cfg: VnpayConfig,
    codec: SignatureCodec,
}

impl VnpayAdapter {
    pub fn new(cfg: VnpayConfig) -> Self {
        let codec = SignatureCodec::new(
            cfg.hash_secret.clone(),
            SIGNATURE_FIELD,
            &[SIGNATURE_TYPE_FIELD],
        );
        VnpayAdapter { cfg, codec }
    }

    pub fn codec(&self) -> &SignatureCodec {
        &self.codec
    }

    /// Gateway amounts carry two implied decimal places even though the
    /// currency itself has none.
    pub fn scale_amount(amount: i64) -> i64 {
        amount * 100
    }

    /// Builds the full redirect URL: validates inputs, signs the raw
    /// parameter set, then serializes it sorted and URL-encoded with the
    /// signature appended last. The expiry window is advisory metadata;
    /// enforcement is the gateway's responsibility.
    pub fn build_redirect(
        &self,
        req: &RedirectRequest,
        now: DateTime<Utc>,
    ) -> Result<String, GatewayError> {
        if req.amount <= 0 {
            return Err(GatewayError::InvalidAmount);
        }
        let txn_ref = sanitize_reference(&req.payment_id.simple().to_string());
        if txn_ref.is_empty() || txn_ref.len() > MAX_TXN_REF_LEN {
            return Err(GatewayError::InvalidReference(txn_ref));
        }

        let tz = FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS).unwrap();
        let create_date = now.with_timezone(&tz).format(DATE_FORMAT).to_string();
        let expire_date = (now + Duration::minutes(self.cfg.expire_minutes))
            .with_timezone(&tz)
            .format(DATE_FORMAT)
            .to_string();

        let mut params = BTreeMap::new();
        params.insert("vnp_Version".to_string(), PROTOCOL_VERSION.to_string());
        params.insert("vnp_Command".to_string(), COMMAND_PAY.to_string());
        params.insert("vnp_TmnCode".to_string(), self.cfg.tmn_code.clone());
        params.insert(
            "vnp_Amount".to_string(),
            Self::scale_amount(req.amount).to_string(),
        );
        params.insert("vnp_CurrCode".to_string(), CURRENCY_CODE.to_string());
        params.insert("vnp_TxnRef".to_string(), txn_ref);
        params.insert("vnp_OrderInfo".to_string(), req.description.clone());
        params.insert("vnp_OrderType".to_string(), "other".to_string());
        params.insert("vnp_Locale".to_string(), self.cfg.locale.clone());
        params.insert("vnp_ReturnUrl".to_string(), self.cfg.return_url.clone());
        params.insert("vnp_IpAddr".to_string(), req.client_ip.clone());
        params.insert("vnp_CreateDate".to_string(), create_date);
        params.insert("vnp_ExpireDate".to_string(), expire_date);
        if let Some(bank_code) = &req.bank_code {
            if !bank_code.is_empty() {
                params.insert("vnp_BankCode".to_string(), bank_code.clone());
            }
        }

        let signature = self.codec.sign(&params);

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &params {
            if value.is_empty() {
                continue;
            }
            query.append_pair(key, value);
        }
        query.append_pair(SIGNATURE_FIELD, &signature);

        Ok(format!("{}?{}", self.cfg.pay_url, query.finish()))
    }

    /// Verifies the notification signature and maps the response/status
    /// code pair through the closed outcome table. Unknown codes are
    /// never treated as success.
    pub fn interpret(&self, params: &BTreeMap<String, String>) -> Interpretation {
        if !self.codec.verify(params) {
            return Interpretation::InvalidSignature;
        }

        let response_code = params
            .get("vnp_ResponseCode")
            .cloned()
            .unwrap_or_default();
        let txn_status = params
            .get("vnp_TransactionStatus")
            .cloned()
            .unwrap_or_default();

        let (outcome, message) = if response_code == "00" && txn_status == "00" {
            (PaymentOutcome::Completed, "Transaction successful".to_string())
        } else {
            (PaymentOutcome::Failed, failure_reason(&response_code))
        };

        Interpretation::Notification(GatewayNotification {
            outcome,
            message,
            txn_ref: params.get("vnp_TxnRef").cloned().unwrap_or_default(),
            transaction_id: params.get("vnp_TransactionNo").cloned().filter(|v| !v.is_empty()),
            bank_reference: params.get("vnp_BankTranNo").cloned().filter(|v| !v.is_empty()),
            amount_minor: params.get("vnp_Amount").and_then(|v| v.parse::<i64>().ok()),
            response_code,
        })
    }
}

fn sanitize_reference(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn failure_reason(code: &str) -> String {
    let known = match code {
        "07" => Some("Transaction flagged as suspicious"),
        "09" => Some("Card or account not registered for online banking"),
        "10" => Some("Authentication failed more than 3 times"),
        "11" => Some("Payment window expired"),
        "12" => Some("Card or account is locked"),
        "13" => Some("Incorrect one-time password"),
        "24" => Some("Transaction cancelled by customer"),
        "51" => Some("Insufficient funds"),
        "65" => Some("Daily transaction limit exceeded"),
        "75" => Some("Bank is under maintenance"),
        "79" => Some("Incorrect payment password entered too many times"),
        _ => None,
    };
    match known {
        Some(reason) => reason.to_string(),
        None => format!("Transaction failed (gateway code {code})"),
    }
}
