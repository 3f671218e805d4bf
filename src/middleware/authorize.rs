//! The permission gate every protected operation passes through.
//!
//! Each operation names the permissions that admit it in [`policy`]; holding
//! any one of them is enough. Handlers call [`Authorizer::require`] with that
//! set before touching a service.

use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthStaff;
use crate::permissions::{Permission, StaffWithPosition};
use crate::services::{ServiceError, StaffService};

pub mod policy {
    use crate::permissions::Permission::{self, *};

    pub const EVENT_CREATE: &[Permission] = &[EventCreate];
    pub const EVENT_GET: &[Permission] = &[EventGetById];
    pub const EVENT_LIST_OWN: &[Permission] = &[EventGetAll];
    pub const EVENT_UPDATE: &[Permission] = &[EventUpdate, OrganizationUpdate];
    pub const EVENT_DELETE: &[Permission] = &[EventDelete, OrganizationDelete];
    pub const EVENT_INVITE: &[Permission] = &[EventCreate, EventUpdate, StaffSelfUpdate];
    pub const EVENT_REMOVE_STAFF: &[Permission] = &[EventCreate, EventDelete];
    pub const EVENT_BY_TEAM: &[Permission] = &[EventGetById, TeamGetById];
    pub const EVENT_BY_ORGANIZATION: &[Permission] = &[OrganizationEvents];

    pub const STEP_CREATE: &[Permission] = &[StepCreate, EventCreate];
    pub const STEP_UPDATE: &[Permission] = &[StepUpdate, EventCreate];
    pub const STEP_GET: &[Permission] = &[StepGetById];
    pub const STEP_DELETE: &[Permission] = &[StepDelete, EventDelete];
    pub const STEP_READ: &[Permission] = &[StepGetAll, EventGetById, EventGetAll];
    pub const STEP_PROGRESS: &[Permission] = &[StepGetAll, EventGetById, EventGetAll];

    pub const PRIZE_CREATE: &[Permission] = &[PrizeCreate];
    pub const PRIZE_GET: &[Permission] = &[PrizeGetById];
    pub const PRIZE_LIST: &[Permission] = &[PrizeGetAll];
    pub const PRIZE_UPDATE: &[Permission] = &[PrizeUpdate];
    pub const PRIZE_DELETE: &[Permission] = &[PrizeDelete];
    pub const PRIZE_GIVE: &[Permission] = &[PrizeGive];

    pub const STAFF_CREATE: &[Permission] = &[StaffCreate];
    pub const STAFF_GET_SELF: &[Permission] = &[StaffSelfGet];
    pub const STAFF_GET_OTHER: &[Permission] = &[StaffGetById, PrizeStaffAll];
    pub const STAFF_UPDATE_SELF: &[Permission] = &[StaffSelfUpdate];
    pub const STAFF_UPDATE_OTHER: &[Permission] = &[StaffUpdate];
    pub const STAFF_DELETE_SELF: &[Permission] = &[StaffSelfDelete];
    pub const STAFF_DELETE_OTHER: &[Permission] = &[StaffDelete];
    pub const STAFF_PRIZES_OTHER: &[Permission] = &[PrizeStaffAll];
    pub const STAFF_INVITES: &[Permission] = &[StaffGetInvites, StaffGetSelfInvites];
    pub const STAFF_BY_ORGANIZATION: &[Permission] = &[StaffByOrganizationId];

    pub const POSITION_CREATE: &[Permission] = &[PositionCreate];
    pub const POSITION_GET: &[Permission] = &[PositionGetById];
    pub const POSITION_LIST: &[Permission] = &[PositionGetAll];
    pub const POSITION_UPDATE: &[Permission] = &[PositionUpdate];
    pub const POSITION_DELETE: &[Permission] = &[PositionDelete];
    pub const POSITION_GIVE: &[Permission] = &[PositionGive];

    pub const ORGANIZATION_CREATE: &[Permission] = &[OrganizationCreate];
    pub const ORGANIZATION_GET: &[Permission] = &[OrganizationGetById];
    pub const ORGANIZATION_LIST: &[Permission] = &[OrganizationGetAll];
    pub const ORGANIZATION_UPDATE: &[Permission] = &[OrganizationUpdate];
    pub const ORGANIZATION_DELETE: &[Permission] = &[OrganizationDelete];
    pub const ORGANIZATION_ADD_STAFF: &[Permission] = &[OrganizationAddStaff];

    pub const ORGANIZATION_TYPE_CREATE: &[Permission] = &[OrganizationTypeCreate];
    pub const ORGANIZATION_TYPE_GET: &[Permission] = &[OrganizationTypeGetById];
    pub const ORGANIZATION_TYPE_LIST: &[Permission] = &[OrganizationTypeGetAll];
    pub const ORGANIZATION_TYPE_UPDATE: &[Permission] = &[OrganizationTypeUpdate];
    pub const ORGANIZATION_TYPE_DELETE: &[Permission] = &[OrganizationTypeDelete];

    pub const TEAM_CREATE: &[Permission] = &[TeamCreate, OrganizationUpdate];
    pub const TEAM_GET: &[Permission] = &[TeamGetById];
    pub const TEAM_LIST: &[Permission] = &[TeamGetAll];
    pub const TEAM_UPDATE: &[Permission] = &[TeamUpdate, OrganizationUpdate];
    pub const TEAM_DELETE: &[Permission] = &[TeamDelete, OrganizationDelete];
}

#[derive(Clone)]
pub struct Authorizer {
    staff: StaffService,
}

impl Authorizer {
    pub fn new(staff: StaffService) -> Self {
        Self { staff }
    }

    /// Loads the caller and checks they hold at least one of `any_of`.
    /// An empty set admits every authenticated caller.
    pub async fn require(&self, caller: &AuthStaff, any_of: &[Permission]) -> Result<StaffWithPosition, ApiError> {
        let staff = match self.staff.get_staff_with_position(caller.staff_id).await {
            Ok(staff) => staff,
            Err(ServiceError::NotFound(_)) => {
                return Err(ApiError::unauthorized("token refers to an unknown staff member"))
            }
            Err(e) => return Err(e.into()),
        };
        if any_of.is_empty() || staff.has_one_of(any_of) {
            return Ok(staff);
        }
        debug!("Staff {} denied; needs one of {:?}", caller.staff_id, any_of);
        Err(ApiError::forbidden("you do not have permission to perform this action"))
    }

    /// Picks the self or the other-staff policy depending on who is targeted.
    pub async fn require_on(
        &self,
        caller: &AuthStaff,
        target: Uuid,
        own: &[Permission],
        others: &[Permission],
    ) -> Result<StaffWithPosition, ApiError> {
        if caller.staff_id == target {
            self.require(caller, own).await
        } else {
            self.require(caller, others).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::position_service::NewPosition;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn holders_pass_and_others_are_forbidden() {
        let ctx = TestContext::new().await;
        let admin = ctx.staff("admin").await;
        let plain = ctx.staff("plain").await;
        let empty = ctx
            .services
            .positions
            .create_position(
                NewPosition {
                    organization_id: None,
                    name: "intern".into(),
                    permissions: vec!["event-get-by-id".into()],
                },
                admin.id,
            )
            .await
            .unwrap();
        ctx.services
            .positions
            .assign_position(plain.id, empty.position.id)
            .await
            .unwrap();

        let gate = Authorizer::new(ctx.services.staff.clone());
        let admin_caller = AuthStaff { staff_id: admin.id };
        let plain_caller = AuthStaff { staff_id: plain.id };

        assert!(gate.require(&admin_caller, policy::EVENT_CREATE).await.is_ok());
        assert!(gate.require(&plain_caller, policy::EVENT_GET).await.is_ok());
        let denied = gate.require(&plain_caller, policy::EVENT_CREATE).await.unwrap_err();
        assert_eq!(denied.status_code(), 403);
        assert!(gate.require(&plain_caller, &[]).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_callers_are_unauthorized() {
        let ctx = TestContext::new().await;
        let gate = Authorizer::new(ctx.services.staff.clone());
        let ghost = AuthStaff {
            staff_id: Uuid::new_v4(),
        };
        let err = gate.require(&ghost, policy::EVENT_GET).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn self_and_other_policies_differ() {
        let ctx = TestContext::new().await;
        let admin = ctx.staff("admin").await;
        let someone = ctx.staff("someone").await;
        let limited = ctx
            .services
            .positions
            .create_position(
                NewPosition {
                    organization_id: None,
                    name: "self-service".into(),
                    permissions: vec!["staff-self-get".into()],
                },
                admin.id,
            )
            .await
            .unwrap();
        ctx.services
            .positions
            .assign_position(someone.id, limited.position.id)
            .await
            .unwrap();

        let gate = Authorizer::new(ctx.services.staff.clone());
        let caller = AuthStaff { staff_id: someone.id };
        assert!(gate
            .require_on(&caller, someone.id, policy::STAFF_GET_SELF, policy::STAFF_GET_OTHER)
            .await
            .is_ok());
        assert!(gate
            .require_on(&caller, admin.id, policy::STAFF_GET_SELF, policy::STAFF_GET_OTHER)
            .await
            .is_err());
    }
}
