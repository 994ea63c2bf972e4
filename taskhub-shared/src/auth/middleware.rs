/// Authentication middleware for axum
///
/// Extracts the `Authorization: Bearer <token>` credential, validates it,
/// and injects an [`AuthContext`] into request extensions. Handlers extract
/// it with axum's `Extension` extractor.
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Router, middleware, routing::get};
/// use taskhub_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("user {} ({})", auth.user_id, auth.email)
/// }
///
/// let app: Router = Router::new()
///     .route("/protected", get(handler))
///     .layer(middleware::from_fn(create_jwt_middleware("secret")));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, Claims, JwtError};
use crate::models::user::UserRole;

/// Authentication context added to request extensions
///
/// Carries the identity claims from the access token: who the caller is,
/// their role, and which tenant their requests are scoped to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// User email
    pub email: String,

    /// Role within the tenant
    pub role: UserRole,

    /// Tenant scope (None only for bootstrap admins)
    pub tenant_id: Option<Uuid>,
}

impl AuthContext {
    /// Creates auth context from validated claims
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            tenant_id: claims.tenant_id,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Malformed authorization header
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingCredentials => "Missing credentials".to_string(),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg,
        };

        (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({
                "error": "unauthorized",
                "message": message,
            })),
        )
            .into_response()
    }
}

/// Parses and validates a bearer token into an [`AuthContext`]
///
/// Shared by the HTTP middleware and the WebSocket handshake (which carries
/// the token as a query parameter instead of a header).
pub fn authenticate_token(token: &str, secret: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    Ok(AuthContext::from_claims(claims))
}

/// JWT authentication middleware
///
/// # Errors
///
/// Returns 401 Unauthorized when the header is missing, not a bearer
/// credential, or the token fails validation.
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let auth_context = authenticate_token(token, &secret)?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure capturing the secret
pub fn create_jwt_middleware(
    secret: impl Into<String>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_token;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_auth_context_from_claims() {
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            "a@x.com".to_string(),
            UserRole::Admin,
            Some(tenant_id),
            Duration::hours(1),
        );

        let context = AuthContext::from_claims(claims);

        assert_eq!(context.user_id, user_id);
        assert_eq!(context.email, "a@x.com");
        assert_eq!(context.role, UserRole::Admin);
        assert_eq!(context.tenant_id, Some(tenant_id));
    }

    #[test]
    fn test_authenticate_token_valid() {
        let claims = Claims::new(
            Uuid::new_v4(),
            "a@x.com".to_string(),
            UserRole::User,
            Some(Uuid::new_v4()),
            Duration::hours(1),
        );
        let token = create_token(&claims, SECRET).unwrap();

        let context = authenticate_token(&token, SECRET).unwrap();
        assert_eq!(context.user_id, claims.sub);
    }

    #[test]
    fn test_authenticate_token_expired() {
        let claims = Claims::new(
            Uuid::new_v4(),
            "a@x.com".to_string(),
            UserRole::User,
            Some(Uuid::new_v4()),
            Duration::seconds(-3600),
        );
        let token = create_token(&claims, SECRET).unwrap();

        let err = authenticate_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(ref m) if m == "Token expired"));
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidToken("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
