//! Time-limited password reset tokens
//!
//! # Format
//!
//! `<payload>.<signature>` where
//! - `payload` is URL-safe base64 (no padding) of canonical JSON
//!   `{"issued_at":<unix seconds>,"user_id":<id>}`
//! - `signature` is HMAC-SHA256 of `payload` keyed with the secret, as 64 hex
//!   characters
//!
//! A token is accepted only if the signature matches (constant-time compare),
//! the payload parses, and `now - issued_at` lies within `[0, max_age]`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime in seconds (30 minutes)
pub const DEFAULT_MAX_AGE_SECS: i64 = 1800;

/// Why a token was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetTokenError {
    /// Not two dot-separated parts, or payload not decodable
    Malformed,

    /// Signature does not match the payload
    BadSignature,

    /// Older than the allowed age
    Expired { age_secs: i64, max_age_secs: i64 },

    /// Issued in the future
    NotYetValid,
}

impl std::fmt::Display for ResetTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetTokenError::Malformed => write!(f, "Malformed token"),
            ResetTokenError::BadSignature => write!(f, "Invalid token signature"),
            ResetTokenError::Expired {
                age_secs,
                max_age_secs,
            } => write!(f, "Token expired ({}s old, max {}s)", age_secs, max_age_secs),
            ResetTokenError::NotYetValid => write!(f, "Token issued in the future"),
        }
    }
}

impl std::error::Error for ResetTokenError {}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    issued_at: i64,
    user_id: i64,
}

/// Issue a reset token for `user_id` at time `now` (unix seconds)
///
/// # Examples
///
/// ```
/// use suzuani_common::auth::reset_token::{issue, verify};
///
/// let token = issue(42, "secret", 1_700_000_000);
/// assert_eq!(verify(&token, "secret", 1800, 1_700_000_100), Ok(42));
/// assert!(verify(&token, "other-secret", 1800, 1_700_000_100).is_err());
/// ```
pub fn issue(user_id: i64, secret: &str, now: i64) -> String {
    let claims = Claims {
        issued_at: now,
        user_id,
    };
    // Field order of Claims is alphabetical, so this is already canonical
    let json = serde_json::to_string(&claims).unwrap_or_default();
    let payload = URL_SAFE_NO_PAD.encode(json.as_bytes());
    let signature = sign(&payload, secret);
    format!("{}.{}", payload, signature)
}

/// Verify a token and return the embedded user id
pub fn verify(token: &str, secret: &str, max_age_secs: i64, now: i64) -> Result<i64, ResetTokenError> {
    let (payload, signature) = token
        .trim()
        .split_once('.')
        .ok_or(ResetTokenError::Malformed)?;

    let expected = sign(payload, secret);
    if expected.is_empty() || !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        return Err(ResetTokenError::BadSignature);
    }

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ResetTokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&json).map_err(|_| ResetTokenError::Malformed)?;

    let age_secs = now - claims.issued_at;
    if age_secs < 0 {
        return Err(ResetTokenError::NotYetValid);
    }
    if age_secs > max_age_secs {
        return Err(ResetTokenError::Expired {
            age_secs,
            max_age_secs,
        });
    }

    Ok(claims.user_id)
}

fn sign(payload: &str, secret: &str) -> String {
    // HMAC accepts keys of any length, so this never takes the else branch
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(payload.as_bytes());
    format!("{:x}", mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";
    const NOW: i64 = 1_730_000_000;

    #[test]
    fn test_valid_token_round_trip() {
        let token = issue(7, SECRET, NOW);
        assert_eq!(verify(&token, SECRET, DEFAULT_MAX_AGE_SECS, NOW), Ok(7));

        // Boundary: exactly max age is still valid
        assert_eq!(
            verify(&token, SECRET, DEFAULT_MAX_AGE_SECS, NOW + DEFAULT_MAX_AGE_SECS),
            Ok(7)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue(7, SECRET, NOW);
        let result = verify(&token, SECRET, DEFAULT_MAX_AGE_SECS, NOW + DEFAULT_MAX_AGE_SECS + 1);
        assert!(matches!(result, Err(ResetTokenError::Expired { .. })));
    }

    #[test]
    fn test_future_token_rejected() {
        let token = issue(7, SECRET, NOW + 60);
        assert_eq!(
            verify(&token, SECRET, DEFAULT_MAX_AGE_SECS, NOW),
            Err(ResetTokenError::NotYetValid)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = issue(7, SECRET, NOW);
        let (_, signature) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"issued_at":1730000000,"user_id":1}"#);
        let forged = format!("{}.{}", forged_payload, signature);

        assert_eq!(
            verify(&forged, SECRET, DEFAULT_MAX_AGE_SECS, NOW),
            Err(ResetTokenError::BadSignature)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue(7, SECRET, NOW);
        assert_eq!(
            verify(&token, "another-secret", DEFAULT_MAX_AGE_SECS, NOW),
            Err(ResetTokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert_eq!(
            verify("no-dot-here", SECRET, DEFAULT_MAX_AGE_SECS, NOW),
            Err(ResetTokenError::Malformed)
        );

        // Correctly signed garbage payload
        let payload = "!!!not-base64!!!";
        let token = format!("{}.{}", payload, sign(payload, SECRET));
        assert_eq!(
            verify(&token, SECRET, DEFAULT_MAX_AGE_SECS, NOW),
            Err(ResetTokenError::Malformed)
        );
    }

    #[test]
    fn test_signature_is_hmac_sha256() {
        // RFC 4231 test case 2
        assert_eq!(
            sign("what do ya want for nothing?", "Jefe"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = issue(123_456, SECRET, NOW);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }
}
