//! Capture-signature verification for checkout callbacks.
//!
//! The provider signs `"{order_id}|{payment_id}"` with the merchant key
//! secret using HMAC-SHA256 and sends the lowercase hex digest alongside the
//! capture. Verification must happen before any booking side effect.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Constant-time verification of a capture signature.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    key_secret: &SecretString,
    provided_hex: &str,
) -> bool {
    let Some(provided) = decode_hex(provided_hex.trim()) else {
        return false;
    };

    let payload = signature_payload(order_id, payment_id);
    let Ok(mut mac) = HmacSha256::new_from_slice(key_secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(payload.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Produce the hex signature for a capture. Seeds and tests use this to
/// fabricate valid callbacks.
pub fn sign_payment(order_id: &str, payment_id: &str, key_secret: &SecretString) -> String {
    let payload = signature_payload(order_id, payment_id);
    hmac_hex(key_secret.expose_secret().as_bytes(), payload.as_bytes())
}

fn signature_payload(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

fn hmac_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    encode_hex(mac.finalize().into_bytes().as_slice())
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 || input.is_empty() {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(&input[index..index + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{sign_payment, verify_payment_signature};

    fn secret() -> SecretString {
        "rzp_test_secret_9x".to_string().into()
    }

    #[test]
    fn signed_capture_verifies() {
        let signature = sign_payment("order_MkVs2Lxy", "pay_29QQoUBi66xm2f", &secret());
        assert!(verify_payment_signature(
            "order_MkVs2Lxy",
            "pay_29QQoUBi66xm2f",
            &secret(),
            &signature,
        ));
    }

    #[test]
    fn tampered_payment_id_fails_verification() {
        let signature = sign_payment("order_MkVs2Lxy", "pay_29QQoUBi66xm2f", &secret());
        assert!(!verify_payment_signature(
            "order_MkVs2Lxy",
            "pay_FORGED000000000",
            &secret(),
            &signature,
        ));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let signature = sign_payment("order_MkVs2Lxy", "pay_29QQoUBi66xm2f", &secret());
        let other: SecretString = "another-secret".to_string().into();
        assert!(!verify_payment_signature(
            "order_MkVs2Lxy",
            "pay_29QQoUBi66xm2f",
            &other,
            &signature,
        ));
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(!verify_payment_signature("order_1", "pay_1", &secret(), "not-hex"));
        assert!(!verify_payment_signature("order_1", "pay_1", &secret(), ""));
        assert!(!verify_payment_signature("order_1", "pay_1", &secret(), "abc"));
    }
}
