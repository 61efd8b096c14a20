//! JWT authentication module.
//!
//! Handles session token generation and validation, and the request
//! extractor that turns a bearer token into a [`Session`].
//!
//! ```text
//! POST /auth/login ──► UserRepository::authenticate ──► JwtManager::issue
//!
//! GET /orders
//!   Authorization: Bearer <jwt>
//!        │
//!        ▼
//!   AuthSession extractor ── missing / invalid / expired ──► 401
//!        │
//!        ├── user row missing or deactivated ──► 401
//!        │   (role and name are taken from the row, not the token)
//!        ▼
//!   session.require(Permission::…) ── role lacks it ──► 403
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use bistro_core::{authorize, AccessError, Permission, Role, Session, User};

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub role: Role,

    pub name: String,

    pub email: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Session {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issue a session token for a staff member.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected session token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller. Handlers that take this reject anonymous
/// requests with 401.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl AuthSession {
    /// Fails with 403 unless the caller's role holds `permission`.
    pub fn require(&self, permission: Permission) -> Result<&Session, ApiError> {
        Ok(authorize(Some(&self.0), Some(permission))?)
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.0.can(permission)
    }
}

impl std::ops::Deref for AuthSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or(AccessError::Unauthenticated)?;

        let claims = state.jwt.validate(token)?;

        // Deactivation and role changes take effect before the token expires.
        let user = state
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "Token for missing or deactivated user");
                ApiError::unauthorized("Account is no longer active")
            })?;

        Ok(AuthSession(Session {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chef() -> User {
        User {
            id: "user-001".to_string(),
            email: "chef@restaurant.com".to_string(),
            password_hash: String::new(),
            name: "Head Chef".to_string(),
            role: Role::Chef,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);
        let token = manager.issue(&chef()).unwrap();

        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.role, Role::Chef);

        let session: Session = claims.into();
        assert_eq!(session.email, "chef@restaurant.com");
        assert!(session.can(Permission::ViewKitchen));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtManager::new("a".to_string(), 3600).issue(&chef()).unwrap();
        let err = JwtManager::new("b".to_string(), 3600).validate(&token).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway.
        let manager = JwtManager::new("test-secret".to_string(), -120);
        let token = manager.issue(&chef()).unwrap();
        assert!(manager.validate(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_require() {
        let session = AuthSession(Session {
            user_id: "u".to_string(),
            name: "Waiter".to_string(),
            email: "waiter@restaurant.com".to_string(),
            role: Role::Waiter,
        });
        assert!(session.require(Permission::CreateOrder).is_ok());
        let err = session.require(Permission::ViewReports).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
    }
}
