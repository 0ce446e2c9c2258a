//! JWT token validation.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use campuslink_core::config::auth::AuthConfig;
use campuslink_core::error::AppError;

use super::claims::Claims;

/// Validates access tokens presented at channel-upgrade time.
///
/// Pure validation: no lookups, no side effects. Namespace-scoped
/// identity checks happen in the realtime authenticator after decoding.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // seconds, for clock skew

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates an access token string.
    ///
    /// Distinguishes malformed credentials (not a JWT at all) from
    /// expired or otherwise invalid ones; both map to the authentication
    /// error kind.
    pub fn decode_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                use jsonwebtoken::errors::ErrorKind as JwtError;
                match e.kind() {
                    JwtError::InvalidToken | JwtError::Base64(_) | JwtError::Json(_) | JwtError::Utf8(_) => {
                        AppError::authentication("Malformed credential")
                    }
                    JwtError::ExpiredSignature => {
                        AppError::authentication("Credential has expired")
                    }
                    JwtError::InvalidSignature => {
                        AppError::authentication("Invalid credential signature")
                    }
                    _ => AppError::authentication(format!("Credential validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::JwtEncoder;
    use campuslink_core::config::auth::AuthConfig;
    use campuslink_core::error::ErrorKind;
    use campuslink_core::types::{TenantId, UserId};
    use campuslink_entity::user::UserRole;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_minutes: 60,
        }
    }

    #[test]
    fn test_roundtrip() {
        let encoder = JwtEncoder::new(&config());
        let decoder = JwtDecoder::new(&config());

        let user_id = UserId::new();
        let token = encoder
            .issue(user_id, TenantId::new("COEP"), UserRole::Student, "Asha")
            .unwrap();

        let claims = decoder.decode_access_token(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.tid.as_str(), "COEP");
        assert_eq!(claims.name, "Asha");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let decoder = JwtDecoder::new(&config());
        let err = decoder.decode_access_token("not-a-jwt").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(err.message.contains("Malformed"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let encoder = JwtEncoder::new(&AuthConfig {
            jwt_secret: "other-secret".to_string(),
            access_token_ttl_minutes: 60,
        });
        let decoder = JwtDecoder::new(&config());

        let token = encoder
            .issue(UserId::new(), TenantId::new("COEP"), UserRole::Admin, "Eve")
            .unwrap();
        let err = decoder.decode_access_token(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }
}
