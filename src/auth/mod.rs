pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub user_id: i64,
    pub username: String,
    pub tenant: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(token_type: TokenType, user_id: i64, username: String, tenant: String) -> Self {
        let now = Utc::now();
        let security = &config::config().security;
        let lifetime = match token_type {
            TokenType::Access => Duration::minutes(security.access_token_minutes),
            TokenType::Refresh => Duration::hours(security.refresh_token_hours),
        };

        Self {
            token_type,
            user_id,
            username,
            tenant,
            jti: Uuid::new_v4().to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Access token carrying the same identity
    pub fn to_access(&self) -> Self {
        Self::new(TokenType::Access, self.user_id, self.username.clone(), self.tenant.clone())
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Token is invalid or expired")]
    Invalid,
    #[error("Token has wrong type")]
    WrongType,
}

fn secret() -> Result<&'static str, TokenError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }
    Ok(secret)
}

pub fn generate_jwt(claims: &Claims) -> Result<String, TokenError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| TokenError::TokenGeneration(e.to_string()))
}

/// Decode a token and require the given type
pub fn decode_jwt(token: &str, expected: TokenType) -> Result<Claims, TokenError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());
    let claims = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("JWT rejected: {}", e);
            TokenError::Invalid
        })?;
    if claims.token_type != expected {
        return Err(TokenError::WrongType);
    }
    Ok(claims)
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue_pair(user_id: i64, username: &str, tenant: &str) -> Result<TokenPair, TokenError> {
    let refresh = Claims::new(TokenType::Refresh, user_id, username.to_string(), tenant.to_string());
    Ok(TokenPair {
        access: generate_jwt(&refresh.to_access())?,
        refresh: generate_jwt(&refresh)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_round_trips_with_types_enforced() {
        let pair = issue_pair(7, "ana", "main").unwrap();
        let access = decode_jwt(&pair.access, TokenType::Access).unwrap();
        assert_eq!(access.user_id, 7);
        assert_eq!(access.tenant, "main");
        assert!(matches!(decode_jwt(&pair.access, TokenType::Refresh), Err(TokenError::WrongType)));
        assert!(decode_jwt(&pair.refresh, TokenType::Refresh).is_ok());
        assert!(matches!(decode_jwt("garbage", TokenType::Access), Err(TokenError::Invalid)));
    }
}
