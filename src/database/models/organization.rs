use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::permissions::Permission;

/// Organization type names that change what gets provisioned with an organization.
pub const TYPE_NONE: &str = "none";
pub const TYPE_DEVELOPER: &str = "developer";

/// Name shared by the fallback position and the fallback team of an organization.
pub const DEFAULT_MEMBERSHIP_NAME: &str = "none";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub website_url: String,
    pub image: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrganizationType {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PermissionGrant {
    pub position_id: Uuid,
    pub permission: Permission,
    pub granted_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDetail {
    #[serde(flatten)]
    pub position: Position,
    pub permissions: Vec<PermissionGrant>,
}

/// An organization with everything provisioned alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationDetail {
    #[serde(flatten)]
    pub organization: Organization,
    pub types: Vec<OrganizationType>,
    pub positions: Vec<PositionDetail>,
    pub teams: Vec<Team>,
}
