use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config;
use crate::tenancy::TenantId;

/// JWT claims. The tenant claim is the only trusted tenant signal: it cannot
/// be forged without the signing key, so it always wins during resolution.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub sub: String,
    pub role: String,
    pub user_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(tenant_id: String, sub: String, role: String, user_id: Uuid) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            tenant_id,
            sub,
            role,
            user_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Authenticated principal extracted from validated claims and injected into
/// request extensions by the tenant scoping middleware.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub tenant: TenantId,
    pub user: String,
    pub role: String,
    pub user_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            tenant: TenantId::new(claims.tenant_id),
            user: claims.sub,
            role: claims.role,
            user_id: claims.user_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate a bearer token and extract its claims. Callers treat any error as
/// "no claim": a malformed or expired token must never leak a tenant claim
/// into resolution, and must never abort the request on its own.
pub fn validate_jwt(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}

/// Password digest used by the login flow.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_claims_through_token() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            "green-pantry".to_string(),
            "alice".to_string(),
            "admin".to_string(),
            user_id,
        );
        let token = generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token).unwrap();
        assert_eq!(decoded.tenant_id, "green-pantry");
        assert_eq!(decoded.sub, "alice");
        assert_eq!(decoded.user_id, user_id);
    }

    #[test]
    fn rejects_garbage_tokens() {
        assert!(validate_jwt("not.a.jwt").is_err());
        assert!(validate_jwt("").is_err());
    }

    #[test]
    fn rejects_tokens_signed_with_other_key() {
        let claims = Claims::new(
            "acme".to_string(),
            "mallory".to_string(),
            "admin".to_string(),
            Uuid::new_v4(),
        );
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"wrong-secret"),
        )
        .unwrap();
        assert!(validate_jwt(&forged).is_err());
    }

    #[test]
    fn password_hash_is_stable_hex() {
        let h = hash_password("hunter2");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_password("hunter2"));
        assert_ne!(h, hash_password("hunter3"));
    }
}
