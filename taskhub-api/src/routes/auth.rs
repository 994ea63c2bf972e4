/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register user, resolving or creating a tenant
/// - `POST /api/auth/login` - Login and get an access token
/// - `POST /api/auth/logout` - Stateless acknowledgement
/// - `GET /api/auth/me` - Current user (authenticated)

use crate::{
    app::AppState,
    error::{map_validation_errors, ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskhub_shared::{
    auth::{jwt, middleware::AuthContext, password},
    email::templates,
    models::{
        tenant::{CreateTenant, Tenant, TenantPlan},
        user::{CreateUser, User, UserRole},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 2, max = 50, message = "Name must be 2-50 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (strength checked separately)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Join an existing tenant by ID
    pub tenant_id: Option<Uuid>,

    /// Or create a new tenant with this name
    #[validate(length(min = 2, max = 100, message = "Tenant name must be 2-100 characters"))]
    pub tenant_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Token + user payload returned by register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

fn issue_token(state: &AppState, user: &User) -> ApiResult<String> {
    let role = user.get_role().unwrap_or(UserRole::User);
    let claims = jwt::Claims::new(
        user.id,
        user.email.clone(),
        role,
        user.tenant_id,
        Duration::hours(state.config.jwt.expires_in_hours),
    );
    Ok(jwt::create_token(&claims, state.jwt_secret())?)
}

/// Register a new user
///
/// Tenant resolution: an explicit `tenantId` must exist; a `tenantName`
/// creates a new tenant; with neither, a tenant named "<name>'s
/// Organization" is created. The user becomes an `admin` of that tenant
/// and receives a best-effort welcome email.
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or email already registered
/// - `500 Internal Server Error`: server error
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate().map_err(map_validation_errors)?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::invalid_field("email", "Email already registered"));
    }

    let tenant = match (req.tenant_id, req.tenant_name.as_deref()) {
        (Some(tenant_id), _) => Tenant::find_by_id(&state.db, tenant_id)
            .await?
            .ok_or_else(|| ApiError::invalid_field("tenantId", "Tenant not found"))?,
        (None, Some(tenant_name)) => {
            Tenant::create(
                &state.db,
                CreateTenant {
                    name: tenant_name.to_string(),
                    plan: TenantPlan::Free,
                    settings: None,
                    custom_domain: None,
                },
            )
            .await?
        }
        (None, None) => {
            Tenant::create(
                &state.db,
                CreateTenant {
                    name: format!("{}'s Organization", req.name),
                    plan: TenantPlan::Free,
                    settings: None,
                    custom_domain: None,
                },
            )
            .await?
        }
    };

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
            role: UserRole::Admin,
            tenant_id: Some(tenant.id),
        },
    )
    .await?;

    // Best effort; a full queue or SMTP outage never fails registration
    state.email.enqueue(templates::welcome(&user));

    let token = issue_token(&state, &user)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Login
///
/// The response is identical for unknown email and wrong password so the
/// endpoint cannot be used to probe which addresses are registered.
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `401 Unauthorized`: invalid credentials
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate().map_err(map_validation_errors)?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let token = issue_token(&state, &user)?;

    Ok(Json(AuthResponse { token, user }))
}

/// Logout
///
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// client drops its copy.
pub async fn logout() -> Json<serde_json::Value> {
    Json(json!({ "message": "Logged out" }))
}

/// Current user
///
/// # Errors
///
/// - `401 Unauthorized`: missing or invalid token
/// - `404 Not Found`: account deleted after the token was issued
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
