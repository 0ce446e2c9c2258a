//! `AuthSession` extractor: validates the Bearer token and resolves the
//! caller's tenant context.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use campuslink_core::error::AppError;
use campuslink_database::store::TenantContext;
use campuslink_realtime::Principal;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller plus the tenant capability context every
/// storage access goes through.
#[derive(Clone)]
pub struct AuthSession {
    pub principal: Principal,
    pub context: TenantContext,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user_id", &self.principal.user_id)
            .field("tenant_id", &self.principal.tenant_id)
            .finish()
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        let (principal, context) = state.authenticator.authenticate(token).await?;
        Ok(Self { principal, context })
    }
}
