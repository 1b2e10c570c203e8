//! Webhook cryptographic utilities
//!
//! Handles HMAC signature verification of webhook payloads and the
//! subscription handshake performed when the webhook is registered.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Header carrying the SHA1 signature of the request body
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// Header carrying the SHA256 signature of the request body
pub const SIGNATURE_256_HEADER: &str = "x-hub-signature-256";

/// Signature verification failure
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,

    #[error("malformed signature header: {0}")]
    Malformed(String),

    #[error("unsupported signature method: {0}")]
    UnsupportedMethod(String),

    #[error("signature does not match request body")]
    Mismatch,
}

/// Digest method named in the signature header (`method=hexdigest`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    Sha1,
    Sha256,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::Sha1 => "sha1",
            SignatureMethod::Sha256 => "sha256",
        }
    }
}

impl std::str::FromStr for SignatureMethod {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(SignatureMethod::Sha1),
            "sha256" => Ok(SignatureMethod::Sha256),
            other => Err(SignatureError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Compute the signature header value for `body`
///
/// Output format matches what the platform sends: `sha1=<hex>` or `sha256=<hex>`.
pub fn sign(method: SignatureMethod, secret: &str, body: &[u8]) -> String {
    let digest = match method {
        SignatureMethod::Sha1 => {
            let mut mac = new_mac::<HmacSha1>(secret);
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
        SignatureMethod::Sha256 => {
            let mut mac = new_mac::<HmacSha256>(secret);
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
    };
    format!("{}={}", method.as_str(), hex::encode(digest))
}

/// Verify a webhook body against its signature header
///
/// `header` is the raw header value, e.g. `sha1=3f2a...`. The digest is
/// compared in constant time.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<SignatureMethod, SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?.trim();

    let (method, hex_digest) = header
        .split_once('=')
        .ok_or_else(|| SignatureError::Malformed(header.to_string()))?;
    let method: SignatureMethod = method.parse()?;

    let expected = hex::decode(hex_digest)
        .map_err(|e| SignatureError::Malformed(format!("invalid hex digest: {}", e)))?;

    let matches = match method {
        SignatureMethod::Sha1 => {
            let mut mac = new_mac::<HmacSha1>(secret);
            mac.update(body);
            mac.verify_slice(&expected).is_ok()
        }
        SignatureMethod::Sha256 => {
            let mut mac = new_mac::<HmacSha256>(secret);
            mac.update(body);
            mac.verify_slice(&expected).is_ok()
        }
    };

    if matches {
        Ok(method)
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Check a subscription handshake
///
/// Returns the challenge to echo back when `mode` is `subscribe` and the
/// supplied token equals the configured validation token.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: &str,
) -> Option<String> {
    match (mode, token) {
        (Some("subscribe"), Some(token)) if token == expected_token => {
            Some(challenge.unwrap_or_default().to_string())
        }
        _ => None,
    }
}

fn new_mac<M: Mac + hmac::digest::KeyInit>(secret: &str) -> M {
    // HMAC accepts keys of any length
    match <M as Mac>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts any key length"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "app_secret";

    #[test]
    fn test_sign_and_verify_sha1() {
        let body = br#"{"object":"page","entry":[]}"#;
        let header = sign(SignatureMethod::Sha1, SECRET, body);
        assert!(header.starts_with("sha1="));
        assert_eq!(
            verify_signature(SECRET, body, Some(&header)),
            Ok(SignatureMethod::Sha1)
        );
    }

    #[test]
    fn test_sign_and_verify_sha256() {
        let body = b"hello";
        let header = sign(SignatureMethod::Sha256, SECRET, body);
        assert!(header.starts_with("sha256="));
        assert_eq!(
            verify_signature(SECRET, body, Some(&header)),
            Ok(SignatureMethod::Sha256)
        );
    }

    #[test]
    fn test_single_byte_mutation_mismatches() {
        let body = br#"{"object":"page","entry":[{"id":"1","time":1}]}"#.to_vec();
        let header = sign(SignatureMethod::Sha1, SECRET, &body);

        for i in 0..body.len() {
            let mut mutated = body.clone();
            mutated[i] ^= 0x01;
            assert_eq!(
                verify_signature(SECRET, &mutated, Some(&header)),
                Err(SignatureError::Mismatch),
                "mutation at byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_wrong_secret_mismatches() {
        let body = b"payload";
        let header = sign(SignatureMethod::Sha256, "other", body);
        assert_eq!(
            verify_signature(SECRET, body, Some(&header)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_header_errors() {
        assert_eq!(
            verify_signature(SECRET, b"x", None),
            Err(SignatureError::Missing)
        );
        assert!(matches!(
            verify_signature(SECRET, b"x", Some("deadbeef")),
            Err(SignatureError::Malformed(_))
        ));
        assert!(matches!(
            verify_signature(SECRET, b"x", Some("sha1=zz")),
            Err(SignatureError::Malformed(_))
        ));
        assert_eq!(
            verify_signature(SECRET, b"x", Some("md5=00")),
            Err(SignatureError::UnsupportedMethod("md5".to_string()))
        );
    }

    #[test]
    fn test_verify_subscription() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("tok"), Some("123"), "tok"),
            Some("123".to_string())
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("bad"), Some("123"), "tok"),
            None
        );
        assert_eq!(
            verify_subscription(Some("unsubscribe"), Some("tok"), Some("123"), "tok"),
            None
        );
        assert_eq!(verify_subscription(None, None, None, "tok"), None);
    }
}
