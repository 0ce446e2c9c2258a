//! JWT token issuance.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

use campuslink_core::config::auth::AuthConfig;
use campuslink_core::error::AppError;
use campuslink_core::types::{TenantId, UserId};
use campuslink_entity::user::UserRole;

use super::claims::Claims;

/// Signs access tokens with the shared HMAC secret.
///
/// Tokens are normally minted by the login flow of the CRUD platform;
/// the encoder also backs the test suites.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    ttl_minutes: u64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates an encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_minutes: config.access_token_ttl_minutes,
        }
    }

    /// Issues a signed access token for the given identity.
    pub fn issue(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        role: UserRole,
        name: impl Into<String>,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            tid: tenant_id,
            role,
            name: name.into(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes as i64)).timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }
}
