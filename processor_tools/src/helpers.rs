use hmac::{Hmac, Mac};
use sha2::Sha512;

/// Percent-encodes a single form value (RFC 3986 unreserved characters pass through).
pub fn url_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Encodes key/value pairs as an `application/x-www-form-urlencoded` body.
pub fn form_encode(pairs: &[(&str, &str)]) -> String {
    pairs.iter().map(|(k, v)| format!("{}={}", url_encode(k), url_encode(v))).collect::<Vec<_>>().join("&")
}

/// Hex-encoded HMAC-SHA512 of `data` under `key`, as CoinPayments signs command bodies and IPN
/// deliveries.
pub fn hmac_sha512_hex(key: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod test {
    use super::{form_encode, hmac_sha512_hex, url_encode};

    #[test]
    fn encoding_reserved_characters() {
        assert_eq!(url_encode("BTC"), "BTC");
        assert_eq!(url_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(form_encode(&[("cmd", "get_callback_address"), ("currency", "BTC")]),
            "cmd=get_callback_address&currency=BTC");
    }

    #[test]
    fn hmac_is_stable() {
        let sig = hmac_sha512_hex("secret", b"payload");
        assert_eq!(sig.len(), 128);
        assert_eq!(sig, hmac_sha512_hex("secret", b"payload"));
        assert_ne!(sig, hmac_sha512_hex("other", b"payload"));
    }
}
