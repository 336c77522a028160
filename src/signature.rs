use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::collections::BTreeMap;

type HmacSha512 = Hmac<Sha512>;

/// Canonical parameter signing for the gateway wire protocol.
///
/// The canonical string is built from the raw (un-encoded) values: empty
/// values and the signature fields are dropped, remaining keys are sorted
/// by raw key bytes, and pairs are joined as `key=value` with `&`. URL
/// encoding happens only when the same parameters are serialized into the
/// redirect URL, never here.
#[derive(Clone)]
pub struct SignatureCodec {
    secret: String,
    signature_field: String,
    excluded_fields: Vec<String>,
}

impl SignatureCodec {
    pub fn new(secret: impl Into<String>, signature_field: &str, excluded_fields: &[&str]) -> Self {
        SignatureCodec {
            secret: secret.into(),
            signature_field: signature_field.to_string(),
            excluded_fields: excluded_fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn signature_field(&self) -> &str {
        &self.signature_field
    }

    pub fn canonicalize(&self, params: &BTreeMap<String, String>) -> String {
        let mut out = String::new();
        for (key, value) in params {
            if value.is_empty() {
                continue;
            }
            if key == &self.signature_field || self.excluded_fields.iter().any(|f| f == key) {
                continue;
            }
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }

    pub fn sign(&self, params: &BTreeMap<String, String>) -> String {
        let canonical = self.canonicalize(params);
        let mut mac = HmacSha512::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(canonical.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies the signature carried in `params` itself. An absent
    /// signature field fails immediately, without computing a digest.
    pub fn verify(&self, params: &BTreeMap<String, String>) -> bool {
        let supplied = match params.get(&self.signature_field) {
            Some(s) if !s.is_empty() => s,
            _ => return false,
        };
        let expected = self.sign(params);
        constant_time_eq(supplied.as_bytes(), expected.as_bytes())
    }
}

/// Byte-for-byte comparison without early exit, to keep verification
/// timing independent of where a mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
