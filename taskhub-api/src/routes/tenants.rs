/// Tenant management endpoints
///
/// Every handler requires the `admin` role; a regular member's token is
/// rejected before any query runs. Tenant deletion is a hard cascade: all
/// users, tasks, comments, and notifications in the tenant go with it,
/// and each affected user gets one deletion notice by email.

use crate::{
    app::AppState,
    error::{map_validation_errors, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use taskhub_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    email::templates,
    models::{
        tenant::{new_subscription_window, CreateTenant, Tenant, TenantPlan, UpdateTenant},
        user::{User, UserRole},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create tenant request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,

    pub plan: Option<TenantPlan>,
    pub settings: Option<JsonValue>,
    pub custom_domain: Option<String>,
}

/// Update tenant request; omitted fields keep their value
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,

    pub plan: Option<TenantPlan>,
    pub settings: Option<JsonValue>,
    pub custom_domain: Option<String>,
}

/// Settings update request
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub settings: JsonValue,
}

/// Subscription update request
#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub plan: TenantPlan,
    pub billing: Option<JsonValue>,
}

/// Tenant with its member summaries
#[derive(Debug, Serialize)]
pub struct TenantWithUsers {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub users: Vec<MemberSummary>,
}

/// Member summary including role
#[derive(Debug, Serialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

fn member_summaries(users: Vec<User>) -> Vec<MemberSummary> {
    users
        .into_iter()
        .map(|u| MemberSummary {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
        })
        .collect()
}

async fn ensure_name_free(state: &AppState, name: &str) -> ApiResult<()> {
    if Tenant::find_by_name(&state.db, name).await?.is_some() {
        return Err(ApiError::invalid_field("name", "Tenant name already exists"));
    }
    Ok(())
}

async fn ensure_domain_free(state: &AppState, domain: &str) -> ApiResult<()> {
    if Tenant::find_by_custom_domain(&state.db, domain)
        .await?
        .is_some()
    {
        return Err(ApiError::invalid_field(
            "customDomain",
            "Custom domain already in use",
        ));
    }
    Ok(())
}

/// Create a tenant
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or name/domain taken
/// - `401 Unauthorized`: caller is not an admin
pub async fn create_tenant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<Tenant>)> {
    require_role(&auth, &[UserRole::Admin])?;
    req.validate().map_err(map_validation_errors)?;

    ensure_name_free(&state, &req.name).await?;
    if let Some(ref domain) = req.custom_domain {
        ensure_domain_free(&state, domain).await?;
    }

    let tenant = Tenant::create(
        &state.db,
        CreateTenant {
            name: req.name,
            plan: req.plan.unwrap_or(TenantPlan::Free),
            settings: req.settings,
            custom_domain: req.custom_domain,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

/// List all tenants with their members
pub async fn list_tenants(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TenantWithUsers>>> {
    require_role(&auth, &[UserRole::Admin])?;

    let tenants = Tenant::list_all(&state.db).await?;

    let mut result = Vec::with_capacity(tenants.len());
    for tenant in tenants {
        let users = User::list_by_tenant(&state.db, tenant.id).await?;
        result.push(TenantWithUsers {
            tenant,
            users: member_summaries(users),
        });
    }

    Ok(Json(result))
}

/// Tenant detail with members
pub async fn get_tenant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TenantWithUsers>> {
    require_role(&auth, &[UserRole::Admin])?;

    let tenant = Tenant::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    let users = User::list_by_tenant(&state.db, id).await?;

    Ok(Json(TenantWithUsers {
        tenant,
        users: member_summaries(users),
    }))
}

/// Update a tenant, re-checking name and domain uniqueness
pub async fn update_tenant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTenantRequest>,
) -> ApiResult<Json<Tenant>> {
    require_role(&auth, &[UserRole::Admin])?;
    req.validate().map_err(map_validation_errors)?;

    let tenant = Tenant::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    if let Some(ref name) = req.name {
        if *name != tenant.name {
            ensure_name_free(&state, name).await?;
        }
    }
    if let Some(ref domain) = req.custom_domain {
        if tenant.custom_domain.as_deref() != Some(domain.as_str()) {
            ensure_domain_free(&state, domain).await?;
        }
    }

    let updated = Tenant::update(
        &state.db,
        id,
        UpdateTenant {
            name: req.name,
            plan: req.plan,
            settings: req.settings,
            custom_domain: req.custom_domain,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    Ok(Json(updated))
}

/// Delete a tenant and everything in it
///
/// The member list is captured before the cascade so each user can be
/// notified afterwards; one email per user, enqueued best-effort.
pub async fn delete_tenant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_role(&auth, &[UserRole::Admin])?;

    let users = User::list_by_tenant(&state.db, id).await?;

    let deleted = Tenant::delete(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Tenant not found".to_string()));
    }

    for user in &users {
        state.email.enqueue(templates::tenant_deletion(user));
    }

    tracing::info!(tenant_id = %id, users = users.len(), "Tenant deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Shallow-merge the settings document
///
/// Top-level keys in the request overwrite existing ones; nested objects
/// are replaced wholesale, not merged.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<Tenant>> {
    require_role(&auth, &[UserRole::Admin])?;

    let tenant = Tenant::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    let mut merged = match tenant.settings {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    };
    if let JsonValue::Object(incoming) = req.settings {
        for (key, value) in incoming {
            merged.insert(key, value);
        }
    }

    let updated = Tenant::update_settings(&state.db, id, JsonValue::Object(merged))
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    Ok(Json(updated))
}

/// Update the subscription plan
///
/// Refreshes the 30-day window from now and emails the tenant's admin.
pub async fn update_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> ApiResult<Json<Tenant>> {
    require_role(&auth, &[UserRole::Admin])?;

    Tenant::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    let subscription = new_subscription_window(Utc::now());
    let billing = req.billing.unwrap_or_else(|| serde_json::json!({}));

    let updated = Tenant::update_subscription(&state.db, id, req.plan, subscription, billing)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    if let Some(admin) = User::find_tenant_admin(&state.db, id).await? {
        state
            .email
            .enqueue(templates::subscription_update(&admin, req.plan.as_str()));
    }

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_validates_name() {
        let req = CreateTenantRequest {
            name: "x".to_string(),
            plan: None,
            settings: None,
            custom_domain: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_member_summaries_keep_role() {
        let users = vec![];
        assert!(member_summaries(users).is_empty());
    }

    #[test]
    fn test_settings_merge_is_shallow() {
        let mut merged = match json!({"theme": "dark", "flags": {"a": true}}) {
            JsonValue::Object(map) => map,
            _ => unreachable!(),
        };
        if let JsonValue::Object(incoming) = json!({"flags": {"b": true}, "locale": "en"}) {
            for (key, value) in incoming {
                merged.insert(key, value);
            }
        }

        assert_eq!(merged["theme"], "dark");
        assert_eq!(merged["locale"], "en");
        // Nested object replaced, not merged
        assert_eq!(merged["flags"], json!({"b": true}));
    }
}
