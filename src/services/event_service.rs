use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bootstrap::Defaults;
use crate::database::models::{
    Event, EventDetail, EventStatus, EventType, InviteStatus, Invitation, Staff, StaffEvent, StaffRole,
    StaffScore,
};
use crate::database::store::*;
use crate::database::DatabaseError;
use crate::services::eligibility::Invitee;
use crate::services::error::{parse_label, ServiceError, ServiceResult};
use crate::services::step_service::{build_step_bundle, NewStep};
use crate::services::validation::{ensure_after, parse_optional_timestamp, require_text};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub creation_date: Option<String>,
    pub end_date: Option<String>,
    pub organization_id: Option<Uuid>,
    pub event_type: Option<String>,
    pub event_status: Option<String>,
    #[serde(default)]
    pub steps: Vec<NewStep>,
}

/// Only supplied fields overwrite the stored event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub end_date: Option<String>,
    pub organization_id: Option<Uuid>,
    pub event_type: Option<String>,
    pub event_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub staff_id: Uuid,
    pub staff_role: Option<String>,
}

/// Event lifecycle, roster and score aggregation.
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn Store>,
    defaults: Defaults,
}

impl EventService {
    pub fn new(store: Arc<dyn Store>, defaults: Defaults) -> Self {
        Self { store, defaults }
    }

    /// Creates the event, its creator roster row and any initial steps in one write.
    pub async fn create_event(&self, new: NewEvent, creator_id: Uuid) -> ServiceResult<EventDetail> {
        require_text("name", &new.name)?;

        let creation_date = parse_optional_timestamp("creation_date", new.creation_date.as_deref())?
            .unwrap_or_else(Utc::now);
        let end_date = parse_optional_timestamp("end_date", new.end_date.as_deref())?;
        if let Some(end) = end_date {
            ensure_after(end, creation_date)?;
        }
        let event_type = match new.event_type.as_deref() {
            Some(raw) => parse_label("event_type", raw)?,
            None => EventType::Public,
        };
        let event_status = match new.event_status.as_deref() {
            Some(raw) => parse_label("event_status", raw)?,
            None => EventStatus::Process,
        };

        let organization_id = new.organization_id.unwrap_or(self.defaults.organization_id);
        if self.store.find_organization(organization_id).await?.is_none() {
            return Err(ServiceError::not_found("organization", organization_id));
        }
        if self.store.find_staff(creator_id).await?.is_none() {
            return Err(ServiceError::not_found("staff", creator_id));
        }

        let event = Event {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            image_path: new.image_path,
            creation_date,
            end_date,
            organization_id,
            created_by: creator_id,
            event_status,
            event_type,
        };
        let creator = StaffEvent {
            id: Uuid::new_v4(),
            staff_id: creator_id,
            event_id: event.id,
            status: InviteStatus::Accepted,
            staff_role: StaffRole::Creator,
        };

        let now = Utc::now();
        let bundles = new
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| build_step_bundle(step, event.id, index as i32 + 1, creator_id, now))
            .collect::<ServiceResult<Vec<_>>>()?;

        self.store.insert_event(&event, &creator, &bundles).await?;
        info!(
            "Created event {} ({}) by {} with {} steps",
            event.id,
            event.event_type,
            creator_id,
            bundles.len()
        );

        Ok(EventDetail {
            event,
            staff: vec![creator],
            steps: bundles.into_iter().map(|b| b.step).collect(),
        })
    }

    pub async fn get_event(&self, id: Uuid) -> ServiceResult<EventDetail> {
        let event = self.load_event(id).await?;
        let staff = self.store.list_roster(id).await?;
        let steps = self.store.list_steps(id).await?;
        Ok(EventDetail { event, staff, steps })
    }

    /// Invites staff to an event. Every invitee is checked against the
    /// event's visibility rule before anything is written, and the batch is
    /// recorded all-or-nothing.
    pub async fn assign_staff(&self, event_id: Uuid, invites: Vec<InviteRequest>) -> ServiceResult<Vec<StaffEvent>> {
        let event = self.load_event(event_id).await?;
        if invites.is_empty() {
            return Ok(Vec::new());
        }

        let mut roles = Vec::with_capacity(invites.len());
        for invite in &invites {
            let role = match invite.staff_role.as_deref() {
                Some(raw) => parse_label("staff_role", raw)?,
                None => StaffRole::Default,
            };
            if role == StaffRole::Creator {
                return Err(ServiceError::validation(
                    "staff_role",
                    "the creator role is assigned only when the event is created",
                ));
            }
            roles.push(role);
        }

        let invitees = self.load_staff(invites.iter().map(|i| i.staff_id)).await?;
        let organizers = match event.event_type {
            EventType::TeamOnly => {
                let roster = self.store.list_roster(event_id).await?;
                let ids = roster
                    .iter()
                    .filter(|row| row.staff_role.is_organizer())
                    .map(|row| row.staff_id);
                let loaded = try_join_all(ids.map(|id| self.store.find_staff(id))).await?;
                loaded.into_iter().flatten().collect()
            }
            _ => Vec::new(),
        };
        let home_organization = match event.event_type {
            EventType::Private => self.home_organization(&event).await?,
            _ => event.organization_id,
        };

        let mut rows = Vec::with_capacity(invitees.len());
        for (staff, role) in invitees.iter().zip(roles) {
            event.event_type.check_invitee(&Invitee {
                event_id,
                staff,
                organizers: &organizers,
                home_organization,
            })?;
            rows.push(StaffEvent {
                id: Uuid::new_v4(),
                staff_id: staff.id,
                event_id,
                status: InviteStatus::Pending,
                staff_role: role,
            });
        }

        self.store.insert_roster(&rows).await.map_err(|err| match err {
            DatabaseError::Conflict(_) => {
                ServiceError::Conflict(format!("staff already invited to event {}", event_id))
            }
            other => other.into(),
        })?;
        info!("Invited {} staff to event {}", rows.len(), event_id);
        Ok(rows)
    }

    pub async fn answer_invitation(&self, staff_id: Uuid, event_id: Uuid, status: &str) -> ServiceResult<()> {
        let status: InviteStatus = parse_label("status", status)?;
        if status == InviteStatus::Pending {
            return Err(ServiceError::validation("status", "an answer must accept or decline"));
        }
        if status == InviteStatus::Declined {
            self.ensure_not_creator(staff_id, event_id).await?;
        }
        if !self.store.set_invitation_status(staff_id, event_id, status).await? {
            return Err(ServiceError::NotFound(format!(
                "no invitation for staff {} to event {}",
                staff_id, event_id
            )));
        }
        debug!("Staff {} answered {} to event {}", staff_id, status, event_id);
        Ok(())
    }

    pub async fn get_invitations(&self, staff_id: Uuid) -> ServiceResult<Vec<Invitation>> {
        Ok(self.store.list_invitations(staff_id).await?)
    }

    pub async fn get_staffs_events(&self, staff_id: Uuid, role: &str) -> ServiceResult<Vec<Event>> {
        let role: StaffRole = parse_label("role", role)?;
        Ok(self.store.list_events_by_role(staff_id, role).await?)
    }

    pub async fn get_events_by_team(&self, team_id: Uuid) -> ServiceResult<Vec<Event>> {
        if self.store.find_team(team_id).await?.is_none() {
            return Err(ServiceError::not_found("team", team_id));
        }
        Ok(self.store.list_events_by_team(team_id).await?)
    }

    pub async fn get_events_by_organization(&self, organization_id: Uuid) -> ServiceResult<Vec<Event>> {
        if self.store.find_organization(organization_id).await?.is_none() {
            return Err(ServiceError::not_found("organization", organization_id));
        }
        Ok(self.store.list_events_by_organization(organization_id).await?)
    }

    /// Drops a staff member from the roster together with their step progress.
    pub async fn remove_staff_from_event(&self, staff_id: Uuid, event_id: Uuid) -> ServiceResult<()> {
        self.ensure_not_creator(staff_id, event_id).await?;
        if !self.store.remove_from_event(staff_id, event_id).await? {
            return Err(ServiceError::NotFound(format!(
                "staff {} is not on the roster of event {}",
                staff_id, event_id
            )));
        }
        info!("Removed staff {} from event {}", staff_id, event_id);
        Ok(())
    }

    /// The creator row stays accepted for the lifetime of the event.
    async fn ensure_not_creator(&self, staff_id: Uuid, event_id: Uuid) -> ServiceResult<()> {
        let roster = self.store.list_roster(event_id).await?;
        let is_creator = roster
            .iter()
            .any(|row| row.staff_id == staff_id && row.staff_role == StaffRole::Creator);
        if is_creator {
            return Err(ServiceError::InvalidTransition(format!(
                "staff {} created event {} and cannot leave it",
                staff_id, event_id
            )));
        }
        Ok(())
    }

    pub async fn get_staff_score(&self, event_id: Uuid, staff_id: Uuid) -> ServiceResult<StaffScore> {
        self.load_event(event_id).await?;
        let score = self.store.staff_score(event_id, staff_id).await?;
        Ok(StaffScore {
            event_id,
            staff_id,
            score,
        })
    }

    pub async fn update_event(&self, id: Uuid, patch: EventPatch) -> ServiceResult<Event> {
        let mut event = self.load_event(id).await?;

        if let Some(name) = patch.name.filter(|n| !n.trim().is_empty()) {
            event.name = name;
        }
        if let Some(description) = patch.description.filter(|d| !d.is_empty()) {
            event.description = Some(description);
        }
        if let Some(image_path) = patch.image_path.filter(|p| !p.is_empty()) {
            event.image_path = Some(image_path);
        }
        if let Some(end) = parse_optional_timestamp("end_date", patch.end_date.as_deref())? {
            ensure_after(end, event.creation_date)?;
            event.end_date = Some(end);
        }
        if let Some(raw) = patch.event_type.as_deref() {
            event.event_type = parse_label("event_type", raw)?;
        }
        if let Some(raw) = patch.event_status.as_deref() {
            event.event_status = parse_label("event_status", raw)?;
        }
        if let Some(organization_id) = patch.organization_id {
            if self.store.find_organization(organization_id).await?.is_none() {
                return Err(ServiceError::not_found("organization", organization_id));
            }
            event.organization_id = organization_id;
        }

        if !self.store.update_event(&event).await? {
            return Err(ServiceError::not_found("event", id));
        }
        Ok(event)
    }

    pub async fn delete_event(&self, id: Uuid) -> ServiceResult<()> {
        if !self.store.delete_event(id).await? {
            return Err(ServiceError::not_found("event", id));
        }
        info!("Deleted event {}", id);
        Ok(())
    }

    async fn load_event(&self, id: Uuid) -> ServiceResult<Event> {
        self.store
            .find_event(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("event", id))
    }

    async fn load_staff(&self, ids: impl Iterator<Item = Uuid>) -> ServiceResult<Vec<Staff>> {
        let ids: Vec<Uuid> = ids.collect();
        let found = try_join_all(ids.iter().map(|id| self.store.find_staff(*id))).await?;
        ids.into_iter()
            .zip(found)
            .map(|(id, staff)| staff.ok_or_else(|| ServiceError::not_found("staff", id)))
            .collect()
    }

    /// The creator's organization, or the event's own once the creator is gone.
    async fn home_organization(&self, event: &Event) -> ServiceResult<Uuid> {
        Ok(self
            .store
            .find_staff(event.created_by)
            .await?
            .map(|creator| creator.organization_id)
            .unwrap_or(event.organization_id))
    }
}
