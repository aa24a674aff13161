//! Session Token
//!
//! Cookie format: `{session_id}.{base64url(HMAC-SHA256(secret, session_id))}`.
//! The signature lets us drop forged cookies without a database round trip.

use platform::crypto::{from_base64_url, hmac_sha256, hmac_sha256_verify, to_base64_url};
use uuid::Uuid;

/// Create a signed session token
pub fn sign_session_token(session_id: &Uuid, secret: &[u8; 32]) -> String {
    let id = session_id.to_string();
    let signature = hmac_sha256(secret, id.as_bytes());
    format!("{}.{}", id, to_base64_url(&signature))
}

/// Verify a session token and return the session id it carries
pub fn verify_session_token(token: &str, secret: &[u8; 32]) -> Option<Uuid> {
    let (session_id_str, signature_b64) = token.split_once('.')?;
    let signature = from_base64_url(signature_b64).ok()?;

    if !hmac_sha256_verify(secret, session_id_str.as_bytes(), &signature) {
        return None;
    }

    session_id_str.parse().ok()
}
