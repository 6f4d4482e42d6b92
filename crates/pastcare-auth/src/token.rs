//! JWT access tokens and opaque refresh token strings.
//!
//! Access tokens are short-lived EdDSA (Ed25519) JWTs carrying the
//! user's church and role. Refresh tokens are random bearer strings;
//! only their SHA-256 digest is ever stored.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pastcare_core::models::user::User;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// `token_type` claim value of access tokens.
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: the user's email.
    pub sub: String,
    pub user_id: String,
    /// Tenant; `None` for super-admins.
    pub church_id: Option<String>,
    pub role: String,
    pub token_type: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issue a signed access token for `user`, valid from `issued_at`.
pub fn issue_access_token(
    user: &User,
    remember_me: bool,
    issued_at: DateTime<Utc>,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let iat = issued_at.timestamp();
    let lifetime = config.access_lifetime_secs(remember_me);
    let exp = i64::try_from(lifetime)
        .ok()
        .and_then(|secs| iat.checked_add(secs))
        .ok_or_else(|| {
            AuthError::Config(format!("access token lifetime of {lifetime}s is out of range"))
        })?;
    let claims = AccessTokenClaims {
        sub: user.email.clone(),
        user_id: user.id.to_string(),
        church_id: user.church_id.map(|c| c.to_string()),
        role: user.role.as_str().to_string(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
        iss: config.jwt_issuer.clone(),
        iat,
        exp,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;

    jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify an access token: signature, issuer, expiry and
/// `token_type`.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    let claims = jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })?;

    if claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(AuthError::TokenInvalid(format!(
            "unexpected token type {}",
            claims.token_type
        )));
    }

    Ok(claims)
}

/// Generate a random opaque refresh token (32 bytes, base64url, no
/// padding).
pub fn generate_refresh_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex-encoded SHA-256 of a raw refresh token; the value persisted as
/// `refresh_token.token_hash`.
pub fn hash_refresh_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
