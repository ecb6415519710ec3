use crate::config::JwtConfig;
use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user the token was issued to.
    pub sub: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
    /// Random token id, so two tokens issued in the same second still differ.
    pub jti: Uuid,
}

/// Signs a new session token for `user_id`, valid for `config.ttl_hours`.
///
/// The caller is responsible for recording the token in `user_tokens`; a signed token
/// that was never recorded is rejected by the middleware.
pub fn generate_token(user_id: Uuid, config: &JwtConfig) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expiration = now
        .checked_add_signed(chrono::Duration::hours(config.ttl_hours))
        .ok_or_else(|| AppError::InternalServerError("Token expiry out of range".into()))?;

    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
        jti: Uuid::new_v4(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Checks the signature and expiry of `token` and returns its claims.
///
/// This says nothing about revocation; see `User::has_token` for that half.
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}
