//! # Access Gate
//!
//! Librarian credentials, JWT issuance and the bearer extractor that guards
//! every mutating route.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /login {email, password}                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  argon2 verify ──► JwtManager::generate_access_token(email)             │
//! │                            │                                            │
//! │                            ▼                                            │
//! │  { "access_token": "eyJ...", "token_type": "bearer" }                   │
//! │                                                                         │
//! │  GET /books/7                                                           │
//! │  Authorization: Bearer eyJ...                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  AuthenticatedLibrarian ──► validate_token ──► librarian still exists?  │
//! │         │                                                               │
//! │         └── any failure ──► 401 + WWW-Authenticate: Bearer              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use lectern_core::Librarian;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (librarian email)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime_secs
    }

    /// Generate an access token for a librarian.
    pub fn generate_access_token(&self, email: &str) -> ApiResult<String> {
        let now = Utc::now();
        let exp = Duration::try_seconds(self.access_lifetime_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ApiError::internal(format!(
                    "Access token lifetime out of range: {}s",
                    self.access_lifetime_secs
                ))
            })?;

        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> ApiResult<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate signature and expiry, then decode the claims.
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::unauthenticated("Could not validate credentials")
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password into PHC string format with a random salt.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Extractor
// =============================================================================

/// The librarian behind a valid bearer token.
///
/// Adding this as a handler argument makes the route require authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedLibrarian(pub Librarian);

impl FromRequestParts<AppState> for AuthenticatedLibrarian {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::unauthenticated("Not authenticated"))?;

        let claims = state.jwt.validate_token(token)?;

        let librarian = state
            .db
            .librarians()
            .get_by_email(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(email = %claims.sub, "Token subject no longer exists");
                ApiError::unauthenticated("Could not validate credentials")
            })?;

        Ok(AuthenticatedLibrarian(librarian))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 1800);

        let token = manager.generate_access_token("test@library.com").unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "test@library.com");
        assert_eq!(claims.exp - claims.iat, 1800);
        assert!(Uuid::parse_str(&claims.jti).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 1800);
        let verifier = JwtManager::new("secret-b".to_string(), 1800);

        let token = issuer.generate_access_token("test@library.com").unwrap();
        let err = verifier.validate_token(&token).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Unauthenticated);
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret".to_string(), 1800);
        let issued = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: "test@library.com".to_string(),
            iat: issued.timestamp(),
            exp: (issued + Duration::minutes(30)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = manager.sign(&claims).unwrap();
        assert!(manager.validate_token(&token).is_err());
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let manager = JwtManager::new("test-secret".to_string(), i64::MAX);

        let err = manager.generate_access_token("test@library.com").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Internal);
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic dXNlcg=="), None);
        assert_eq!(extract_bearer_token("abc.def"), None);
    }

    #[test]
    fn test_password_hash_verify() {
        let hash = hash_password("testpass").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("testpass", &hash));
        assert!(!verify_password("wrongpass", &hash));
        assert!(!verify_password("testpass", "not-a-phc-string"));
    }
}
