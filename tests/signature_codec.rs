use payment_orchestrator::signature::SignatureCodec;
use std::collections::BTreeMap;

fn codec() -> SignatureCodec {
    SignatureCodec::new("s3cret", "vnp_SecureHash", &["vnp_SecureHashType"])
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn canonicalizes_sorted_raw_pairs() {
    let codec = codec();
    let params = params(&[
        ("vnp_TxnRef", "abc123"),
        ("vnp_Amount", "10000000"),
        ("vnp_OrderInfo", "Payment for order O1"),
    ]);
    assert_eq!(
        codec.canonicalize(&params),
        "vnp_Amount=10000000&vnp_OrderInfo=Payment for order O1&vnp_TxnRef=abc123"
    );
}

#[test]
fn canonicalization_drops_empty_values_and_signature_fields() {
    let codec = codec();
    let params = params(&[
        ("vnp_Amount", "100"),
        ("vnp_BankCode", ""),
        ("vnp_SecureHash", "deadbeef"),
        ("vnp_SecureHashType", "HmacSHA512"),
    ]);
    assert_eq!(codec.canonicalize(&params), "vnp_Amount=100");
}

#[test]
fn sign_then_verify_round_trips() {
    let codec = codec();
    let mut p = params(&[("vnp_Amount", "100"), ("vnp_TxnRef", "ref1")]);
    let signature = codec.sign(&p);
    p.insert("vnp_SecureHash".to_string(), signature);
    assert!(codec.verify(&p));
}

#[test]
fn flipping_any_signature_byte_fails_verification() {
    let codec = codec();
    let mut p = params(&[("vnp_Amount", "100"), ("vnp_TxnRef", "ref1")]);
    let signature = codec.sign(&p);

    for i in 0..signature.len() {
        let mut tampered = signature.clone().into_bytes();
        tampered[i] ^= 0x01;
        p.insert(
            "vnp_SecureHash".to_string(),
            String::from_utf8_lossy(&tampered).into_owned(),
        );
        assert!(!codec.verify(&p), "flipped byte {i} was accepted");
    }
}

#[test]
fn missing_signature_fails_immediately() {
    let codec = codec();
    let p = params(&[("vnp_Amount", "100")]);
    assert!(!codec.verify(&p));

    let mut with_empty = p.clone();
    with_empty.insert("vnp_SecureHash".to_string(), String::new());
    assert!(!codec.verify(&with_empty));
}

#[test]
fn signature_depends_on_secret() {
    let p = params(&[("vnp_Amount", "100")]);
    let a = SignatureCodec::new("secret-a", "vnp_SecureHash", &[]).sign(&p);
    let b = SignatureCodec::new("secret-b", "vnp_SecureHash", &[]).sign(&p);
    assert_ne!(a, b);
}

#[test]
fn signature_is_hex_sha512_length() {
    let codec = codec();
    let p = params(&[("vnp_Amount", "100")]);
    let signature = codec.sign(&p);
    assert_eq!(signature.len(), 128);
    assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
}
