use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::step::Step;

crate::wire_enum! {
    pub enum EventStatus as "event_status" {
        Process = "process",
        Finished = "finished",
        Canceled = "canceled",
    }
}

crate::wire_enum! {
    /// Visibility of an event; decides who may be invited.
    pub enum EventType as "event_type" {
        Public = "public",
        Private = "private",
        TeamOnly = "team-only",
    }
}

crate::wire_enum! {
    pub enum InviteStatus as "invite_status" {
        Accepted = "accepted",
        Pending = "none" | "in-progress",
        Declined = "declined" | "declared",
    }
}

crate::wire_enum! {
    pub enum StaffRole as "staff_role" {
        Creator = "creator",
        Admin = "admin",
        Default = "default",
    }
}

impl StaffRole {
    /// Creators and admins organize an event; their teams bound a team-only roster.
    pub fn is_organizer(&self) -> bool {
        matches!(self, StaffRole::Creator | StaffRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub event_status: EventStatus,
    pub event_type: EventType,
}

/// Roster row: one per (staff, event) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StaffEvent {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub event_id: Uuid,
    pub status: InviteStatus,
    pub staff_role: StaffRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub staff: Vec<StaffEvent>,
    pub steps: Vec<Step>,
}

/// A roster row paired with the event it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(flatten)]
    pub invitation: StaffEvent,
    pub event: Event,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
pub struct StaffScore {
    pub event_id: Uuid,
    pub staff_id: Uuid,
    pub score: i64,
}
