//! Authentication and authorization.
//!
//! Bearer-token (JWT) verification plus the [`AuthUser`] principal that is
//! passed explicitly into every service call. User registration and profile
//! management live in a separate identity service; this API only verifies
//! tokens it is handed.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ServiceError, AppState};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated principal extracted from a verified JWT.
///
/// Every order/cart/payment operation takes one of these explicitly; there
/// is no ambient request-scoped "current user".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Staff actors see all orders and may drive status updates.
    pub fn is_staff(&self) -> bool {
        self.has_role("staff") || self.has_role("admin")
    }

    /// Display name for gateway buyer-contact fields.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "Customer".to_string())
    }
}

/// Token issuance and verification.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    jwt_expiration: usize,
}

impl AuthService {
    pub fn new(jwt_secret: String, jwt_expiration: usize) -> Self {
        Self {
            jwt_secret,
            jwt_expiration,
        }
    }

    /// Issues a signed token for the given principal.
    pub fn issue_token(&self, user: &AuthUser) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.user_id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            roles: user.roles.clone(),
            iat: now,
            exp: now + self.jwt_expiration as i64,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Unauthorized(format!("failed to sign token: {}", e)))
    }

    /// Verifies a bearer token and returns the principal it carries.
    pub fn verify_token(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;

        let claims = data.claims;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("invalid subject claim".to_string()))?;

        Ok(AuthUser {
            user_id,
            name: claims.name,
            email: claims.email,
            phone: claims.phone,
            address: claims.address,
            roles: claims.roles,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("missing authorization header".to_string())
            })?;

        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            ServiceError::Unauthorized("authorization header is not a bearer token".to_string())
        })?;

        state.auth.verify_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(roles: Vec<&str>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            name: Some("Rosa Gardener".to_string()),
            email: Some("rosa@example.com".to_string()),
            phone: Some("01700000000".to_string()),
            address: Some("12 Petal Lane".to_string()),
            roles: roles.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn token_round_trip_preserves_principal() {
        let service = AuthService::new("test-secret-with-plenty-of-entropy-0123".into(), 3600);
        let user = test_user(vec!["staff"]);

        let token = service.issue_token(&user).unwrap();
        let verified = service.verify_token(&token).unwrap();

        assert_eq!(verified.user_id, user.user_id);
        assert_eq!(verified.email, user.email);
        assert!(verified.is_staff());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = AuthService::new("test-secret-with-plenty-of-entropy-0123".into(), 3600);
        let other = AuthService::new("a-completely-different-secret-key-456".into(), 3600);

        let token = service.issue_token(&test_user(vec![])).unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn staff_check_accepts_admin_role() {
        assert!(test_user(vec!["admin"]).is_staff());
        assert!(test_user(vec!["staff"]).is_staff());
        assert!(!test_user(vec!["customer"]).is_staff());
    }
}
