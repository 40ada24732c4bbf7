//! Authentication
//!
//! Bearer-token authentication for the coordinator's HTTP surface: password
//! hashing for the signup flow and JWT issuance/validation for
//! login/session checks, plus an axum extractor that reads the
//! `Authorization: Bearer <token>` header the way the original service's
//! `require_auth` decorator does.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

const TOKEN_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// JWT claims. `sub` carries the username, matching the original reference's
/// `jwt.encode({"sub": username, ...}, SECRET_KEY)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
}

/// Hash a password with SHA-256. Password hashing sits outside this
/// service's own concerns — this keeps the teacher's existing scheme rather
/// than introducing a salted KDF nobody asked for.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    hash_password(password) == hash
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Issues a signed bearer token for `username`, valid for 24 hours.
pub fn issue_token(username: &str, secret_key: &str) -> Result<String, String> {
    let now = current_timestamp();
    let claims = Claims {
        sub: username.to_string(),
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret_key.as_bytes()),
    )
    .map_err(|e| format!("failed to sign token: {e}"))
}

/// Validates a bearer token and returns the username it was issued for.
/// `jsonwebtoken`'s own `exp` check rejects expired tokens.
pub fn validate_token(token: &str, secret_key: &str) -> Result<String, String> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret_key.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| format!("invalid token: {e}"))?;
    Ok(data.claims.sub)
}

pub mod extractor {
    use super::validate_token;
    use axum::{
        extract::FromRequestParts,
        http::{request::Parts, StatusCode},
        Json,
    };
    use serde_json::json;

    /// The authenticated username, extracted from `Authorization: Bearer
    /// <token>` and validated against the app's secret key.
    pub struct AuthenticatedUser(pub String);

    impl<S> FromRequestParts<S> for AuthenticatedUser
    where
        S: SecretKeySource + Sync,
    {
        type Rejection = (StatusCode, Json<serde_json::Value>);

        async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
            let unauthorized = || {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "missing or invalid authorization header" })),
                )
            };

            let header = parts
                .headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(unauthorized)?;

            let token = header.strip_prefix("Bearer ").ok_or_else(unauthorized)?;

            validate_token(token, state.secret_key())
                .map(AuthenticatedUser)
                .map_err(|_| unauthorized())
        }
    }

    /// Lets `AuthenticatedUser` extract from any axum state type that can
    /// hand back the signing secret, without coupling it to one concrete
    /// `AppState` struct.
    pub trait SecretKeySource {
        fn secret_key(&self) -> &str;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashing_is_deterministic() {
        let hash1 = hash_password("secret123");
        let hash2 = hash_password("secret123");
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash_password("different"));
    }

    #[test]
    fn verify_password_checks_against_hash() {
        let hash = hash_password("correct-horse");
        assert!(verify_password("correct-horse", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn token_roundtrips_to_username() {
        let token = issue_token("alice", "testsecret").unwrap();
        let username = validate_token(&token, "testsecret").unwrap();
        assert_eq!(username, "alice");
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let token = issue_token("alice", "testsecret").unwrap();
        assert!(validate_token(&token, "othersecret").is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(validate_token("not-a-jwt", "testsecret").is_err());
    }
}
