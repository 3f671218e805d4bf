use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

crate::wire_enum! {
    pub enum Sex as "sex" {
        Male = "male",
        Female = "female",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub sex: Sex,
    pub additional_info: Option<String>,
    pub organization_id: Uuid,
    pub team_id: Uuid,
    pub position_id: Option<Uuid>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
    pub current_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffImage {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Reassignment of one staff member inside an organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Membership {
    pub staff_id: Uuid,
    pub organization_id: Uuid,
    pub team_id: Uuid,
    pub position_id: Option<Uuid>,
}
