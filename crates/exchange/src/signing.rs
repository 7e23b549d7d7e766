//! Bybit V5 request signing: REST header construction and WS auth payloads.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `HMAC-SHA256(secret, timestamp ‖ api_key ‖ recv_window ‖ payload)`,
/// hex-encoded. For GET requests `payload` is the canonicalized query
/// string (or empty); for POST it is the literal compact JSON body.
pub fn sign(secret: &str, timestamp: &str, api_key: &str, recv_window: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.as_bytes());
    mac.update(api_key.as_bytes());
    mac.update(recv_window.as_bytes());
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// `HMAC-SHA256(secret, "GET/realtime" ‖ expires_ms)`, used for the private
/// WS auth handshake.
pub fn sign_ws_auth(secret: &str, expires_ms: i64) -> String {
    let payload = format!("GET/realtime{expires_ms}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_deterministic() {
        let a = sign("secret", "1000", "key", "5000", "{}");
        let b = sign("secret", "1000", "key", "5000", "{}");
        assert_eq!(a, b);
    }

    #[test]
    fn sign_changes_with_payload() {
        let a = sign("secret", "1000", "key", "5000", "{}");
        let b = sign("secret", "1000", "key", "5000", "{\"x\":1}");
        assert_ne!(a, b);
    }
}
