use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::SecurityConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub staff_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Issues and checks bearer tokens.
#[derive(Clone)]
pub struct AuthService {
    secret: String,
    ttl_hours: u64,
}

impl AuthService {
    pub fn new(secret: impl Into<String>, ttl_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_hours,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(security.jwt_secret.clone(), security.jwt_expiry_hours)
    }

    pub fn issue_token(&self, staff_id: Uuid) -> Result<String, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }
        let now = Utc::now();
        let claims = Claims {
            staff_id,
            exp: (now + Duration::hours(self.ttl_hours as i64)).timestamp(),
            iat: now.timestamp(),
        };
        let key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), &claims, &key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Returns the staff id carried by a valid, unexpired token.
    pub fn verify_token(&self, token: &str) -> Result<Uuid, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }
        let key = DecodingKey::from_secret(self.secret.as_bytes());
        decode::<Claims>(token, &key, &Validation::default())
            .map(|data| data.claims.staff_id)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Salted SHA-256, stored as `salt$hex`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_the_staff_id() {
        let auth = AuthService::new("secret", 12);
        let staff_id = Uuid::new_v4();
        let token = auth.issue_token(staff_id).unwrap();
        assert_eq!(auth.verify_token(&token).unwrap(), staff_id);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = AuthService::new("one", 12).issue_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            AuthService::new("two", 12).verify_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn an_empty_secret_issues_nothing() {
        assert!(matches!(
            AuthService::new("", 12).issue_token(Uuid::new_v4()),
            Err(AuthError::MissingSecret)
        ));
    }

    #[test]
    fn passwords_are_salted() {
        let first = hash_password("hunter2");
        let second = hash_password("hunter2");
        assert_ne!(first, second);
        assert!(verify_password("hunter2", &first));
        assert!(verify_password("hunter2", &second));
        assert!(!verify_password("hunter3", &first));
        assert!(!verify_password("hunter2", "garbage"));
    }
}
