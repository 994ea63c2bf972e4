/// Role and tenant authorization checks
///
/// Handlers call these after the authentication middleware has populated
/// the request with an [`AuthContext`]. Role checks fail with 401; tenant
/// checks fail with 403, so a logged-in user without a tenant gets a
/// different signal than a caller with no valid token at all.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Authorization failure
#[derive(Debug, PartialEq)]
pub enum AuthzError {
    /// Caller's role is not in the allowed set
    InsufficientRole,

    /// Operation requires a tenant scope the caller does not have
    TenantRequired,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthzError::InsufficientRole => {
                (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized")
            }
            AuthzError::TenantRequired => {
                (StatusCode::FORBIDDEN, "forbidden", "Tenant context required")
            }
        };

        (
            status,
            axum::Json(serde_json::json!({ "error": code, "message": message })),
        )
            .into_response()
    }
}

/// Checks that the caller holds one of the allowed roles
///
/// An empty `allowed` slice permits any authenticated caller.
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if allowed.is_empty() || allowed.contains(&auth.role) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole)
    }
}

/// Returns the caller's tenant ID, or fails when no tenant is attached
///
/// Every tenant-scoped query must filter on the ID this returns; handlers
/// never accept a tenant ID from the request body or path for scoping.
pub fn require_tenant(auth: &AuthContext) -> Result<Uuid, AuthzError> {
    auth.tenant_id.ok_or(AuthzError::TenantRequired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_context(tenant_id: Option<Uuid>) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            role: UserRole::Admin,
            tenant_id,
        }
    }

    fn user_context(tenant_id: Option<Uuid>) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            role: UserRole::User,
            tenant_id,
        }
    }

    #[test]
    fn test_require_role_allows_matching_role() {
        let auth = admin_context(Some(Uuid::new_v4()));
        assert!(require_role(&auth, &[UserRole::Admin]).is_ok());
    }

    #[test]
    fn test_require_role_rejects_missing_role() {
        let auth = user_context(Some(Uuid::new_v4()));
        assert_eq!(
            require_role(&auth, &[UserRole::Admin]),
            Err(AuthzError::InsufficientRole)
        );
    }

    #[test]
    fn test_require_role_empty_allows_anyone() {
        let auth = user_context(None);
        assert!(require_role(&auth, &[]).is_ok());
    }

    #[test]
    fn test_require_tenant_returns_id() {
        let tenant_id = Uuid::new_v4();
        let auth = user_context(Some(tenant_id));
        assert_eq!(require_tenant(&auth), Ok(tenant_id));
    }

    #[test]
    fn test_require_tenant_rejects_missing_tenant() {
        let auth = admin_context(None);
        assert_eq!(require_tenant(&auth), Err(AuthzError::TenantRequired));
    }

    #[test]
    fn test_role_miss_is_401_and_tenant_miss_is_403() {
        assert_eq!(
            AuthzError::InsufficientRole.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthzError::TenantRequired.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
