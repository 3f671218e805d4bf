//! Permission catalogue and the membership checks that gate every operation.
//!
//! A staff member holds exactly the permissions granted to their position.
//! There is no inheritance or wildcard: `has_permission` is a plain
//! membership test, and a staff member without a position holds nothing.

use serde::Serialize;

use crate::database::models::{PositionDetail, Staff};

crate::wire_enum! {
    pub enum Permission as "permission_name" {
        EventCreate = "event-create",
        EventUpdate = "event-update",
        EventDelete = "event-delete",
        EventGetById = "event-get-by-id",
        EventGetAll = "event-get-all",

        StepCreate = "step-create",
        StepUpdate = "step-update",
        StepDelete = "step-delete",
        StepGetById = "step-get-by-id",
        StepGetAll = "step-get-all",

        OrganizationCreate = "organization-create",
        OrganizationUpdate = "organization-update",
        OrganizationDelete = "organization-delete",
        OrganizationGetById = "organization-get-by-id",
        OrganizationGetAll = "organization-get-all",
        OrganizationEvents = "organization-events",
        OrganizationAddStaff = "organization-add-staff",

        OrganizationTypeCreate = "organization-type-create",
        OrganizationTypeUpdate = "organization-type-update",
        OrganizationTypeDelete = "organization-type-delete",
        OrganizationTypeGetById = "organization-type-get-by-id",
        OrganizationTypeGetAll = "organization-type-get-all",

        PrizeCreate = "prize-create",
        PrizeUpdate = "prize-update",
        PrizeDelete = "prize-delete",
        PrizeGetById = "prize-get-by-id",
        PrizeGetAll = "prize-get-all",
        PrizeGive = "prize-give",
        PrizeStaffAll = "prize-staff-all",

        TeamCreate = "team-create",
        TeamUpdate = "team-update",
        TeamDelete = "team-delete",
        TeamGetById = "team-get-by-id",
        TeamGetAll = "team-get-all",

        PositionCreate = "position-create",
        PositionUpdate = "position-update",
        PositionDelete = "position-delete",
        PositionGetById = "position-get-by-id",
        PositionGetAll = "position-get-all",
        PositionGive = "position-give",

        StaffCreate = "staff-create",
        StaffUpdate = "staff-update",
        StaffDelete = "staff-delete",
        StaffGetById = "staff-get-by-id",
        StaffGetAll = "staff-get-all",
        StaffSelfUpdate = "staff-self-update",
        StaffSelfDelete = "staff-self-delete",
        StaffSelfGet = "staff-self-get",
        StaffByOrganizationId = "staff-by-organization-id",
        StaffGetInvites = "staff-get-invites",
        StaffGetSelfInvites = "staff-get-self-invites",
    }
}

impl Permission {
    /// Event management grants seeded onto every role of a `developer` organization.
    pub const EVENT_MANAGEMENT: &'static [Permission] = &[
        Permission::EventCreate,
        Permission::EventUpdate,
        Permission::EventDelete,
        Permission::EventGetAll,
        Permission::EventGetById,
    ];
}

impl PositionDetail {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.iter().any(|grant| grant.permission == permission)
    }
}

/// A staff member together with the position their permissions come from.
#[derive(Debug, Clone, Serialize)]
pub struct StaffWithPosition {
    #[serde(flatten)]
    pub staff: Staff,
    pub position: Option<PositionDetail>,
}

impl StaffWithPosition {
    pub fn has_permission(&self, permission: Permission) -> bool {
        match &self.position {
            Some(position) => position.has_permission(permission),
            None => false,
        }
    }

    pub fn has_one_of(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.has_permission(*p))
    }
}
