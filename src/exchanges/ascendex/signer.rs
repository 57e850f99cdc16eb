use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Path segment AscendEX appends to the timestamp when signing the stream upgrade
pub const STREAM_SIGNING_PATH: &str = "stream";

pub const AUTH_KEY_HEADER: &str = "x-auth-key";
pub const AUTH_TIMESTAMP_HEADER: &str = "x-auth-timestamp";
pub const AUTH_SIGNATURE_HEADER: &str = "x-auth-signature";

/// Sign the stream upgrade for the current wall-clock time.
///
/// Returns the base64 signature and the millisecond timestamp it covers.
pub fn generate_signature(secret: &str) -> (String, i64) {
    let timestamp = Utc::now().timestamp_millis();
    (sign_with_timestamp(secret, timestamp), timestamp)
}

/// base64(HMAC-SHA256(secret, "{timestamp}stream"))
pub fn sign_with_timestamp(secret: &str, timestamp: i64) -> String {
    let prehash = format!("{}{}", timestamp, STREAM_SIGNING_PATH);

    // HMAC pads or hashes the key, so every length (including zero) is valid.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(prehash.as_bytes());

    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Headers for the authenticated upgrade request
pub fn auth_headers(api_key: &str, secret: &str) -> Vec<(&'static str, String)> {
    let (signature, timestamp) = generate_signature(secret);
    vec![
        (AUTH_KEY_HEADER, api_key.to_string()),
        (AUTH_TIMESTAMP_HEADER, timestamp.to_string()),
        (AUTH_SIGNATURE_HEADER, signature),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_signature() {
        let (signature, timestamp) = generate_signature("secret");

        assert!(!signature.is_empty());
        assert!(timestamp > 0);
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sign_with_timestamp("secret", 1_700_000_000_000),
            "cmrx3Ql+LKf/fYUU9rrEoh0bhhXd8F6NoZvi9h67P0Q="
        );
    }

    #[test]
    fn test_empty_secret_signs() {
        assert_eq!(
            sign_with_timestamp("", 1_700_000_000_000),
            "ITtJsdoE9bi77MBNfedscUuiAZBlSicRxIU1wr1K/+U="
        );
    }

    #[test]
    fn test_deterministic_for_fixed_timestamp() {
        let first = sign_with_timestamp("fAZcQRUMxj3eX3Dr", 1_700_000_000_123);
        let second = sign_with_timestamp("fAZcQRUMxj3eX3Dr", 1_700_000_000_123);
        assert_eq!(first, second);
        assert_ne!(first, sign_with_timestamp("fAZcQRUMxj3eX3Dr", 1_700_000_000_124));
    }

    #[test]
    fn test_signatures_differ_over_time() {
        let (first_sig, first_ts) = generate_signature("secret");
        std::thread::sleep(Duration::from_millis(5));
        let (second_sig, second_ts) = generate_signature("secret");

        assert!(second_ts > first_ts);
        assert_ne!(first_sig, second_sig);
    }

    #[test]
    fn test_auth_headers() {
        let headers = auth_headers("my_key", "secret");
        let names: Vec<&str> = headers.iter().map(|(name, _)| *name).collect();

        assert_eq!(
            names,
            vec![AUTH_KEY_HEADER, AUTH_TIMESTAMP_HEADER, AUTH_SIGNATURE_HEADER]
        );
        assert_eq!(headers[0].1, "my_key");

        let timestamp: i64 = headers[1].1.parse().unwrap();
        assert_eq!(headers[2].1, sign_with_timestamp("secret", timestamp));
    }
}
