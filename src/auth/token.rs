//! Signed API tokens
//!
//! Short-lived HS256 JWTs issued from an API key and secret.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Claims carried by an API token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// API key the token was issued for
    pub iss: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Create a signed API token
///
/// Token format: base64(header).base64(claims).base64(hmac_sha256(header.claims))
///
/// # Arguments
/// * `api_key` - Issuer claim
/// * `api_secret` - HMAC secret key
/// * `expires_at` - Expiry claim
pub fn sign_token(
    api_key: &str,
    api_secret: &str,
    expires_at: DateTime<Utc>,
) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};

    let claims = TokenClaims {
        iss: api_key.to_string(),
        exp: expires_at.timestamp(),
    };
    let claims_json =
        serde_json::to_string(&claims).map_err(|e| AppError::Credential(e.to_string()))?;

    let header_b64 = general_purpose::URL_SAFE_NO_PAD.encode(JWT_HEADER.as_bytes());
    let claims_b64 = general_purpose::URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let signature = hmac_sha256(api_secret, &signing_input)?;
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", signing_input, signature_b64))
}

fn hmac_sha256(secret: &str, input: &str) -> Result<Vec<u8>, AppError> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Credential(e.to_string()))?;
    mac.update(input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
