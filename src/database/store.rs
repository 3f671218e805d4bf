//! Storage seams used by the services.
//!
//! Every method that touches more than one row is a single atomic unit in
//! each backend: either all of its rows are written or none are.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::*;
use crate::permissions::Permission;

pub type StoreResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait StaffStore: Send + Sync {
    async fn insert_staff(&self, staff: &Staff) -> StoreResult<()>;
    async fn find_staff(&self, id: Uuid) -> StoreResult<Option<Staff>>;
    async fn find_staff_by_email(&self, email: &str) -> StoreResult<Option<Staff>>;
    /// Overwrites every column of an existing row.
    async fn update_staff(&self, staff: &Staff) -> StoreResult<bool>;
    async fn delete_staff(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_staff_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Staff>>;
    async fn list_staff_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Staff>>;
    async fn list_staff_by_step(&self, step_id: Uuid) -> StoreResult<Vec<Staff>>;
    /// Moves a batch of staff members between organizations, teams and positions.
    async fn apply_memberships(&self, memberships: &[Membership]) -> StoreResult<()>;
    async fn insert_staff_image(&self, image: &StaffImage) -> StoreResult<()>;
    async fn list_staff_images(&self, staff_id: Uuid) -> StoreResult<Vec<StaffImage>>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Writes the organization, its type links, positions with grants, and teams.
    async fn insert_organization(&self, detail: &OrganizationDetail) -> StoreResult<()>;
    async fn find_organization(&self, id: Uuid) -> StoreResult<Option<Organization>>;
    async fn find_organization_by_name(&self, name: &str) -> StoreResult<Option<Organization>>;
    async fn list_organizations(&self) -> StoreResult<Vec<Organization>>;
    async fn list_types_of_organization(&self, organization_id: Uuid) -> StoreResult<Vec<OrganizationType>>;
    async fn update_organization(&self, organization: &Organization) -> StoreResult<bool>;
    async fn delete_organization(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_organization_type(&self, org_type: &OrganizationType) -> StoreResult<()>;
    async fn find_organization_type(&self, id: Uuid) -> StoreResult<Option<OrganizationType>>;
    async fn find_organization_type_by_name(&self, name: &str) -> StoreResult<Option<OrganizationType>>;
    async fn list_organization_types(&self) -> StoreResult<Vec<OrganizationType>>;
    async fn update_organization_type(&self, org_type: &OrganizationType) -> StoreResult<bool>;
    async fn delete_organization_type(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_team(&self, team: &Team) -> StoreResult<()>;
    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>>;
    async fn find_team_by_name(&self, organization_id: Uuid, name: &str) -> StoreResult<Option<Team>>;
    async fn list_teams_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Team>>;
    /// Distinct teams of the staff on an event roster.
    async fn list_teams_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Team>>;
    async fn update_team(&self, team: &Team) -> StoreResult<bool>;
    async fn delete_team(&self, id: Uuid) -> StoreResult<bool>;

    /// Writes the position together with its grants.
    async fn insert_position(&self, detail: &PositionDetail) -> StoreResult<()>;
    async fn find_position(&self, id: Uuid) -> StoreResult<Option<PositionDetail>>;
    async fn find_position_by_name(&self, organization_id: Uuid, name: &str) -> StoreResult<Option<PositionDetail>>;
    async fn list_positions(&self, organization_id: Uuid) -> StoreResult<Vec<PositionDetail>>;
    async fn rename_position(&self, id: Uuid, name: &str) -> StoreResult<bool>;
    /// Adds grants, leaving permissions the position already holds untouched.
    async fn grant_permissions(&self, grants: &[PermissionGrant]) -> StoreResult<()>;
    async fn revoke_permissions(&self, position_id: Uuid, permissions: &[Permission]) -> StoreResult<u64>;
    async fn delete_position(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Writes the event, its creator roster row, and every step bundle.
    async fn insert_event(&self, event: &Event, creator: &StaffEvent, steps: &[StepBundle]) -> StoreResult<()>;
    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn update_event(&self, event: &Event) -> StoreResult<bool>;
    /// Removes the event with its roster, steps, progress rows and prizes.
    async fn delete_event(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_roster(&self, event_id: Uuid) -> StoreResult<Vec<StaffEvent>>;
    /// Inserts every row or none; a duplicate (staff, event) pair is a conflict.
    async fn insert_roster(&self, rows: &[StaffEvent]) -> StoreResult<()>;
    async fn set_invitation_status(&self, staff_id: Uuid, event_id: Uuid, status: InviteStatus) -> StoreResult<bool>;
    /// Deletes the roster row and the staff member's progress on every step of the event.
    async fn remove_from_event(&self, staff_id: Uuid, event_id: Uuid) -> StoreResult<bool>;
    async fn list_invitations(&self, staff_id: Uuid) -> StoreResult<Vec<Invitation>>;

    async fn list_events_by_role(&self, staff_id: Uuid, role: StaffRole) -> StoreResult<Vec<Event>>;
    async fn list_events_by_team(&self, team_id: Uuid) -> StoreResult<Vec<Event>>;
    async fn list_events_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Event>>;
    async fn staff_score(&self, event_id: Uuid, staff_id: Uuid) -> StoreResult<i64>;
}

#[async_trait]
pub trait StepStore: Send + Sync {
    /// Appends the step after the event's current last level and returns it as stored.
    async fn insert_step(&self, bundle: &StepBundle) -> StoreResult<Step>;
    async fn find_step(&self, id: Uuid) -> StoreResult<Option<Step>>;
    async fn list_steps(&self, event_id: Uuid) -> StoreResult<Vec<Step>>;
    async fn list_step_images(&self, step_id: Uuid) -> StoreResult<Vec<StepImage>>;
    /// Rewrites a step that is still open and appends images; false when it
    /// is gone or already terminal.
    async fn update_step(&self, step: &Step, new_images: &[StepImage]) -> StoreResult<bool>;
    /// Moves an open step to `to`; false when it is gone or already terminal.
    async fn close_step(&self, id: Uuid, to: StepStatus) -> StoreResult<bool>;
    async fn delete_step(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_step_staff(&self, row: &StepStaff) -> StoreResult<()>;
    async fn list_step_staff(&self, step_id: Uuid) -> StoreResult<Vec<StepStaff>>;
    /// Records an outcome and, when given, enrolls the staff member on the
    /// next step unless they are already there. Returns the updated row, or
    /// `None` when the staff member was never assigned to the step.
    async fn record_result(
        &self,
        staff_id: Uuid,
        step_id: Uuid,
        accomplishment: Accomplishment,
        score: i32,
        advance: Option<&StepStaff>,
    ) -> StoreResult<Option<StepStaff>>;

    /// Finishes every open step whose end date is not after `now`.
    async fn finish_due_steps(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait PrizeStore: Send + Sync {
    async fn insert_prize(&self, prize: &Prize) -> StoreResult<()>;
    async fn find_prize(&self, id: Uuid) -> StoreResult<Option<Prize>>;
    async fn list_prizes(&self) -> StoreResult<Vec<Prize>>;
    async fn list_prizes_by_step(&self, step_id: Uuid) -> StoreResult<Vec<Prize>>;
    async fn list_prizes_by_creator(&self, staff_id: Uuid) -> StoreResult<Vec<Prize>>;
    async fn list_prizes_by_type(&self, prize_type: PrizeType) -> StoreResult<Vec<Prize>>;
    /// Updates descriptive fields; counts are never touched here.
    async fn update_prize(&self, prize: &Prize) -> StoreResult<bool>;
    async fn delete_prize(&self, id: Uuid) -> StoreResult<bool>;
    /// Takes one unit of the prize and records the award in one step.
    async fn award_prize(&self, award: &StaffPrize) -> StoreResult<AwardOutcome>;
    async fn list_staff_prizes(&self, staff_id: Uuid) -> StoreResult<Vec<AwardedPrize>>;
}

/// Everything the services need from persistence.
pub trait Store: StaffStore + OrganizationStore + EventStore + StepStore + PrizeStore {}

impl<T> Store for T where T: StaffStore + OrganizationStore + EventStore + StepStore + PrizeStore {}
