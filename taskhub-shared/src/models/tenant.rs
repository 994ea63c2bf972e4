/// Tenant model and database operations
///
/// Tenants are the isolation boundary of the system: every user, task,
/// comment, and notification row is partitioned by tenant id.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tenants (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL UNIQUE,
///     plan VARCHAR(50) NOT NULL DEFAULT 'free',
///     settings JSONB NOT NULL DEFAULT '{}',
///     custom_domain VARCHAR(255) UNIQUE,
///     subscription JSONB NOT NULL DEFAULT '{}',
///     billing JSONB NOT NULL DEFAULT '{}',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tenants_plan_check CHECK (
///         plan IN ('free', 'pro', 'enterprise')
///     )
/// );
/// ```
///
/// The `subscription` document carries the current window:
/// `{"status": "active", "start_date": ..., "end_date": ...}`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

/// Billing plan types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    /// Free plan (default on registration)
    Free,

    /// Professional plan
    Pro,

    /// Enterprise plan (custom pricing)
    Enterprise,
}

impl TenantPlan {
    /// Converts plan to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantPlan::Free => "free",
            TenantPlan::Pro => "pro",
            TenantPlan::Enterprise => "enterprise",
        }
    }

    /// Parses plan from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(TenantPlan::Free),
            "pro" => Some(TenantPlan::Pro),
            "enterprise" => Some(TenantPlan::Enterprise),
            _ => None,
        }
    }
}

/// Tenant model representing an isolated customer organization
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    /// Unique tenant ID (UUID v4)
    pub id: Uuid,

    /// Organization name (unique)
    pub name: String,

    /// Current billing plan
    pub plan: String,

    /// Tenant-specific configuration (JSONB)
    ///
    /// Example: {"user_limit": 10, "theme": {"primary_color": "#4A90E2"}}
    pub settings: JsonValue,

    /// Optional custom domain (unique)
    pub custom_domain: Option<String>,

    /// Subscription window: status, start and end dates
    pub subscription: JsonValue,

    /// Billing details (company, address, payment method)
    pub billing: JsonValue,

    /// Whether the tenant is active
    pub is_active: bool,

    /// When the tenant was created
    pub created_at: DateTime<Utc>,

    /// When the tenant was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    /// Organization name
    pub name: String,

    /// Billing plan
    pub plan: TenantPlan,

    /// Optional settings document
    pub settings: Option<JsonValue>,

    /// Optional custom domain
    pub custom_domain: Option<String>,
}

/// Input for updating an existing tenant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTenant {
    /// New organization name
    pub name: Option<String>,

    /// New billing plan
    pub plan: Option<TenantPlan>,

    /// Replacement settings document
    pub settings: Option<JsonValue>,

    /// New custom domain
    pub custom_domain: Option<String>,
}

/// Builds a fresh 30-day subscription window starting now
pub fn new_subscription_window(now: DateTime<Utc>) -> JsonValue {
    json!({
        "status": "active",
        "start_date": now,
        "end_date": now + Duration::days(30),
    })
}

impl Tenant {
    /// Creates a new tenant with an active 30-day subscription window
    pub async fn create(pool: &PgPool, data: CreateTenant) -> Result<Self, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, plan, settings, custom_domain, subscription)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, plan, settings, custom_domain, subscription, billing,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.plan.as_str())
        .bind(data.settings.unwrap_or_else(|| json!({})))
        .bind(data.custom_domain)
        .bind(new_subscription_window(Utc::now()))
        .fetch_one(pool)
        .await?;

        Ok(tenant)
    }

    /// Finds a tenant by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, plan, settings, custom_domain, subscription, billing,
                   is_active, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Finds a tenant by its unique name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, plan, settings, custom_domain, subscription, billing,
                   is_active, created_at, updated_at
            FROM tenants
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Finds a tenant by its custom domain
    pub async fn find_by_custom_domain(
        pool: &PgPool,
        domain: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, plan, settings, custom_domain, subscription, billing,
                   is_active, created_at, updated_at
            FROM tenants
            WHERE custom_domain = $1
            "#,
        )
        .bind(domain)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Lists all tenants, newest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, plan, settings, custom_domain, subscription, billing,
                   is_active, created_at, updated_at
            FROM tenants
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(tenants)
    }

    /// Updates mutable tenant fields (name, plan, settings, custom domain)
    ///
    /// Fields left as `None` keep their current value.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTenant,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET name = COALESCE($2, name),
                plan = COALESCE($3, plan),
                settings = COALESCE($4, settings),
                custom_domain = COALESCE($5, custom_domain),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, plan, settings, custom_domain, subscription, billing,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.plan.map(|p| p.as_str()))
        .bind(data.settings)
        .bind(data.custom_domain)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Replaces the settings document
    pub async fn update_settings(
        pool: &PgPool,
        id: Uuid,
        settings: JsonValue,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET settings = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, plan, settings, custom_domain, subscription, billing,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(settings)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Updates plan, subscription window, and billing details together
    pub async fn update_subscription(
        pool: &PgPool,
        id: Uuid,
        plan: TenantPlan,
        subscription: JsonValue,
        billing: JsonValue,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET plan = $2, subscription = $3, billing = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, plan, settings, custom_domain, subscription, billing,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(plan.as_str())
        .bind(subscription)
        .bind(billing)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Deletes a tenant
    ///
    /// All users, tasks, comments, and notifications scoped to the tenant are
    /// removed by ON DELETE CASCADE.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
