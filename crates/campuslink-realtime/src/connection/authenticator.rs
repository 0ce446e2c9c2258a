//! Channel-upgrade authentication.
//!
//! Validates the presented access token, resolves the tenant it names, and
//! confirms the identity exists inside that tenant's namespace. All four
//! failure cases (missing/garbled credential, expired or bad signature,
//! unknown or unapproved tenant, identity absent from the namespace) are
//! rejected before a connection is ever registered.

use std::sync::Arc;

use tracing::debug;

use campuslink_auth::jwt::JwtDecoder;
use campuslink_core::error::AppError;
use campuslink_core::result::AppResult;
use campuslink_core::types::{TenantId, UserId};
use campuslink_database::store::{TenantContext, TenantDirectory};
use campuslink_entity::user::UserRole;

/// The verified identity behind a connection or API call.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: UserRole,
    /// Display name taken from the namespace record, not the token.
    pub display_name: String,
}

/// Authenticates access tokens into a [`Principal`] plus the tenant
/// capability context the rest of the session runs against.
pub struct WsAuthenticator {
    decoder: JwtDecoder,
    directory: Arc<dyn TenantDirectory>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    pub fn new(decoder: JwtDecoder, directory: Arc<dyn TenantDirectory>) -> Self {
        Self { decoder, directory }
    }

    /// Validates a raw token and resolves the session identity.
    ///
    /// Tenant resolution happens exactly once here; the returned context
    /// is bound to the tenant's storage namespace for the lifetime of the
    /// session.
    pub async fn authenticate(&self, token: &str) -> AppResult<(Principal, TenantContext)> {
        if token.trim().is_empty() {
            return Err(AppError::authentication("Missing credential"));
        }

        let claims = self.decoder.decode_access_token(token)?;
        let context = self.directory.resolve(&claims.tid).await?;

        let user = context
            .store
            .find_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::authentication("Unknown identity for this campus"))?;

        debug!(
            tenant_id = %claims.tid,
            user_id = %user.id,
            "channel credential accepted"
        );

        let principal = Principal {
            user_id: user.id,
            tenant_id: claims.tid,
            role: user.role,
            display_name: user.name,
        };
        Ok((principal, context))
    }
}
