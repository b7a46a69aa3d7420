//! Signed user access tokens.
//!
//! Payload: expiry_ts (u64 BE) || user_id (16 bytes) = 24 bytes.
//! Token = base64url(payload || HMAC-SHA256(secret, payload)).

use base64::Engine;
use hmac::{Hmac, Mac};
use reciva_core::AppError;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const PAYLOAD_LEN: usize = 8 + 16; // expiry + user_id
const MAC_LEN: usize = 32; // SHA256
const TOKEN_LEN: usize = PAYLOAD_LEN + MAC_LEN;

/// Build a signed access token for a user.
///
/// This service only verifies tokens on requests; minting happens out of
/// band in the account system, which shares the signing secret. `create`
/// lives here so both halves of the format stay next to each other and the
/// round trip can be tested.
pub fn create(user_id: Uuid, expires_in: Duration, secret: &[u8]) -> Result<String, AppError> {
    let expiry_ts = SystemTime::now()
        .checked_add(expires_in)
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[0..8].copy_from_slice(&expiry_ts.to_be_bytes());
    payload[8..24].copy_from_slice(user_id.as_bytes());

    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|_| AppError::Internal("Invalid token signing key".to_string()))?;
    mac.update(&payload);
    let tag = mac.finalize().into_bytes();

    let mut token_bytes = [0u8; TOKEN_LEN];
    token_bytes[0..PAYLOAD_LEN].copy_from_slice(&payload);
    token_bytes[PAYLOAD_LEN..].copy_from_slice(&tag);

    Ok(base64_url_encode(&token_bytes))
}

/// Verify a token and return the embedded user id.
pub fn verify(token: &str, secret: &[u8]) -> Result<Uuid, AppError> {
    let invalid = || AppError::Unauthorized("Invalid access token".to_string());

    let decoded = base64_url_decode(token).map_err(|_| invalid())?;
    if decoded.len() != TOKEN_LEN {
        return Err(invalid());
    }
    let (payload, tag) = decoded.split_at(PAYLOAD_LEN);
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|_| AppError::Internal("Invalid token signing key".to_string()))?;
    mac.update(payload);
    mac.verify_slice(tag).map_err(|_| invalid())?;

    let expiry_bytes: [u8; 8] = payload[0..8].try_into().map_err(|_| invalid())?;
    let expiry_ts = u64::from_be_bytes(expiry_bytes);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    if now > expiry_ts {
        return Err(AppError::Unauthorized("Access token has expired".to_string()));
    }

    let id_bytes: [u8; 16] = payload[8..24].try_into().map_err(|_| invalid())?;
    Ok(Uuid::from_bytes(id_bytes))
}

fn base64_url_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn round_trip() {
        let user_id = Uuid::new_v4();
        let token = create(user_id, Duration::from_secs(3600), SECRET).unwrap();
        assert_eq!(verify(&token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = create(Uuid::new_v4(), Duration::from_secs(3600), SECRET).unwrap();
        assert!(matches!(
            verify(&token, b"another-secret-another-secret-xx"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_rejected() {
        let token = create(Uuid::new_v4(), Duration::ZERO, SECRET).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert!(matches!(
            verify(&token, SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn tampered_token_rejected() {
        let token = create(Uuid::new_v4(), Duration::from_secs(3600), SECRET).unwrap();
        let mut bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(&token)
            .unwrap();
        bytes[10] ^= 0x01;
        let tampered = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes);
        assert!(verify(&tampered, SECRET).is_err());
    }

    #[test]
    fn garbage_rejected() {
        assert!(verify("not-a-token", SECRET).is_err());
        assert!(verify("", SECRET).is_err());
    }
}
