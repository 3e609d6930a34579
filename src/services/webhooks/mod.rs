pub mod github;
pub mod stripe;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `parts` concatenated.
pub fn sign_hex(secret: &str, parts: &[&[u8]]) -> String {
    let mut mac = mac_for(secret);
    for part in parts {
        mac.update(part);
    }
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of a hex signature against HMAC-SHA256 of `parts`.
pub fn verify_hex(secret: &str, parts: &[&[u8]], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let mut mac = mac_for(secret);
    for part in parts {
        mac.update(part);
    }
    mac.verify_slice(&expected).is_ok()
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify() {
        let sig = sign_hex("secret", &[b"hello"]);
        assert!(verify_hex("secret", &[b"hel", b"lo"], &sig));
        assert!(!verify_hex("other", &[b"hello"], &sig));
        assert!(!verify_hex("secret", &[b"hello!"], &sig));
        assert!(!verify_hex("secret", &[b"hello"], "not-hex"));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign_hex("Jefe", &[b"what do ya want for nothing?"]),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
