//! In-process store used by tests and by `--memory` runs.
//!
//! All tables live behind one async mutex. Each method validates its whole
//! batch before mutating anything, which gives the same all-or-nothing
//! behaviour as a database transaction, and reproduces the uniqueness and
//! foreign-key rules of the Postgres schema.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::*;
use crate::database::store::*;
use crate::permissions::Permission;

#[derive(Default)]
struct Tables {
    organizations: Vec<Organization>,
    organization_types: Vec<OrganizationType>,
    type_links: Vec<(Uuid, Uuid)>,
    teams: Vec<Team>,
    positions: Vec<Position>,
    grants: Vec<PermissionGrant>,
    staff: Vec<Staff>,
    staff_images: Vec<StaffImage>,
    events: Vec<Event>,
    roster: Vec<StaffEvent>,
    steps: Vec<Step>,
    step_images: Vec<StepImage>,
    step_staff: Vec<StepStaff>,
    prizes: Vec<Prize>,
    staff_prizes: Vec<StaffPrize>,
}

fn conflict(constraint: &str) -> DatabaseError {
    DatabaseError::Conflict(constraint.to_string())
}

fn broken(constraint: &str) -> DatabaseError {
    DatabaseError::ForeignKey(constraint.to_string())
}

impl Tables {
    fn has_organization(&self, id: Uuid) -> bool {
        self.organizations.iter().any(|o| o.id == id)
    }

    fn has_team(&self, id: Uuid) -> bool {
        self.teams.iter().any(|t| t.id == id)
    }

    fn has_position(&self, id: Uuid) -> bool {
        self.positions.iter().any(|p| p.id == id)
    }

    fn has_staff(&self, id: Uuid) -> bool {
        self.staff.iter().any(|s| s.id == id)
    }

    fn has_event(&self, id: Uuid) -> bool {
        self.events.iter().any(|e| e.id == id)
    }

    fn has_step(&self, id: Uuid) -> bool {
        self.steps.iter().any(|s| s.id == id)
    }

    fn check_staff_refs(&self, staff: &Staff) -> StoreResult<()> {
        if self
            .staff
            .iter()
            .any(|s| s.id != staff.id && s.email == staff.email)
        {
            return Err(conflict("staff_email_key"));
        }
        if !self.has_organization(staff.organization_id) {
            return Err(broken("staff_organization_id_fkey"));
        }
        if !self.has_team(staff.team_id) {
            return Err(broken("staff_team_id_fkey"));
        }
        if let Some(position_id) = staff.position_id {
            if !self.has_position(position_id) {
                return Err(broken("staff_position_id_fkey"));
            }
        }
        Ok(())
    }

    fn position_detail(&self, position: &Position) -> PositionDetail {
        PositionDetail {
            position: position.clone(),
            permissions: self
                .grants
                .iter()
                .filter(|g| g.position_id == position.id)
                .cloned()
                .collect(),
        }
    }

    fn check_bundle(&self, bundle: &StepBundle) -> StoreResult<()> {
        if bundle.prizes.iter().any(|p| p.step_id != bundle.step.id)
            || bundle.images.iter().any(|i| i.step_id != bundle.step.id)
        {
            return Err(broken("prizes_step_id_fkey"));
        }
        if bundle.step.end_date <= bundle.step.creation_date {
            return Err(DatabaseError::Conflict("steps_check".to_string()));
        }
        Ok(())
    }

    fn write_bundle(&mut self, bundle: &StepBundle) {
        self.steps.push(bundle.step.clone());
        self.prizes.extend(bundle.prizes.iter().cloned());
        self.step_images.extend(bundle.images.iter().cloned());
    }

    fn remove_steps(&mut self, step_ids: &HashSet<Uuid>) {
        let prize_ids: HashSet<Uuid> = self
            .prizes
            .iter()
            .filter(|p| step_ids.contains(&p.step_id))
            .map(|p| p.id)
            .collect();
        self.staff_prizes.retain(|a| !prize_ids.contains(&a.prize_id));
        self.prizes.retain(|p| !step_ids.contains(&p.step_id));
        self.step_images.retain(|i| !step_ids.contains(&i.step_id));
        self.step_staff.retain(|r| !step_ids.contains(&r.step_id));
        self.steps.retain(|s| !step_ids.contains(&s.id));
    }

    fn events_where(&self, staff_filter: impl Fn(&Staff) -> bool, also: impl Fn(&Event) -> bool) -> Vec<Event> {
        let staff_ids: HashSet<Uuid> = self
            .staff
            .iter()
            .filter(|s| staff_filter(s))
            .map(|s| s.id)
            .collect();
        let event_ids: HashSet<Uuid> = self
            .roster
            .iter()
            .filter(|r| staff_ids.contains(&r.staff_id))
            .map(|r| r.event_id)
            .collect();
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| event_ids.contains(&e.id) || also(e))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.creation_date);
        events
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StaffStore for MemoryStore {
    async fn insert_staff(&self, staff: &Staff) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if t.has_staff(staff.id) {
            return Err(conflict("staff_pkey"));
        }
        t.check_staff_refs(staff)?;
        t.staff.push(staff.clone());
        Ok(())
    }

    async fn find_staff(&self, id: Uuid) -> StoreResult<Option<Staff>> {
        let t = self.tables.lock().await;
        Ok(t.staff.iter().find(|s| s.id == id).cloned())
    }

    async fn find_staff_by_email(&self, email: &str) -> StoreResult<Option<Staff>> {
        let t = self.tables.lock().await;
        Ok(t.staff.iter().find(|s| s.email == email).cloned())
    }

    async fn update_staff(&self, staff: &Staff) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.has_staff(staff.id) {
            return Ok(false);
        }
        t.check_staff_refs(staff)?;
        if let Some(row) = t.staff.iter_mut().find(|s| s.id == staff.id) {
            *row = staff.clone();
        }
        Ok(true)
    }

    async fn delete_staff(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.has_staff(id) {
            return Ok(false);
        }
        t.staff_images.retain(|i| i.staff_id != id);
        t.roster.retain(|r| r.staff_id != id);
        t.step_staff.retain(|r| r.staff_id != id);
        t.staff_prizes.retain(|a| a.staff_id != id);
        t.staff.retain(|s| s.id != id);
        Ok(true)
    }

    async fn list_staff_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Staff>> {
        let t = self.tables.lock().await;
        Ok(t.staff
            .iter()
            .filter(|s| s.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn list_staff_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Staff>> {
        let t = self.tables.lock().await;
        let ids: HashSet<Uuid> = t
            .roster
            .iter()
            .filter(|r| r.event_id == event_id)
            .map(|r| r.staff_id)
            .collect();
        Ok(t.staff.iter().filter(|s| ids.contains(&s.id)).cloned().collect())
    }

    async fn list_staff_by_step(&self, step_id: Uuid) -> StoreResult<Vec<Staff>> {
        let t = self.tables.lock().await;
        let ids: HashSet<Uuid> = t
            .step_staff
            .iter()
            .filter(|r| r.step_id == step_id)
            .map(|r| r.staff_id)
            .collect();
        Ok(t.staff.iter().filter(|s| ids.contains(&s.id)).cloned().collect())
    }

    async fn apply_memberships(&self, memberships: &[Membership]) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        let mut updated = Vec::with_capacity(memberships.len());
        for m in memberships {
            let mut staff = t
                .staff
                .iter()
                .find(|s| s.id == m.staff_id)
                .cloned()
                .ok_or_else(|| DatabaseError::NotFound(format!("staff {}", m.staff_id)))?;
            staff.organization_id = m.organization_id;
            staff.team_id = m.team_id;
            staff.position_id = m.position_id;
            t.check_staff_refs(&staff)?;
            updated.push(staff);
        }
        for staff in updated {
            if let Some(row) = t.staff.iter_mut().find(|s| s.id == staff.id) {
                *row = staff;
            }
        }
        Ok(())
    }

    async fn insert_staff_image(&self, image: &StaffImage) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if !t.has_staff(image.staff_id) {
            return Err(broken("staff_images_staff_id_fkey"));
        }
        t.staff_images.push(image.clone());
        Ok(())
    }

    async fn list_staff_images(&self, staff_id: Uuid) -> StoreResult<Vec<StaffImage>> {
        let t = self.tables.lock().await;
        Ok(t.staff_images
            .iter()
            .filter(|i| i.staff_id == staff_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn insert_organization(&self, detail: &OrganizationDetail) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        let org_id = detail.organization.id;
        if t.has_organization(org_id) {
            return Err(conflict("organizations_pkey"));
        }
        for org_type in &detail.types {
            if !t.organization_types.iter().any(|ty| ty.id == org_type.id) {
                return Err(broken("organization_type_links_type_id_fkey"));
            }
        }
        let mut names = HashSet::new();
        for position in &detail.positions {
            if position.position.organization_id != org_id {
                return Err(broken("positions_organization_id_fkey"));
            }
            if !names.insert(position.position.name.as_str()) {
                return Err(conflict("positions_organization_id_name_key"));
            }
        }
        if detail.teams.iter().any(|team| team.organization_id != org_id) {
            return Err(broken("teams_organization_id_fkey"));
        }

        t.organizations.push(detail.organization.clone());
        for org_type in &detail.types {
            t.type_links.push((org_id, org_type.id));
        }
        for position in &detail.positions {
            t.positions.push(position.position.clone());
            t.grants.extend(position.permissions.iter().cloned());
        }
        t.teams.extend(detail.teams.iter().cloned());
        Ok(())
    }

    async fn find_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let t = self.tables.lock().await;
        Ok(t.organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn find_organization_by_name(&self, name: &str) -> StoreResult<Option<Organization>> {
        let t = self.tables.lock().await;
        Ok(t.organizations.iter().find(|o| o.name == name).cloned())
    }

    async fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        let t = self.tables.lock().await;
        Ok(t.organizations.clone())
    }

    async fn list_types_of_organization(&self, organization_id: Uuid) -> StoreResult<Vec<OrganizationType>> {
        let t = self.tables.lock().await;
        let ids: HashSet<Uuid> = t
            .type_links
            .iter()
            .filter(|(org, _)| *org == organization_id)
            .map(|(_, ty)| *ty)
            .collect();
        Ok(t.organization_types
            .iter()
            .filter(|ty| ids.contains(&ty.id))
            .cloned()
            .collect())
    }

    async fn update_organization(&self, organization: &Organization) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t.organizations.iter_mut().find(|o| o.id == organization.id) {
            Some(row) => {
                *row = organization.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_organization(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.has_organization(id) {
            return Ok(false);
        }
        let team_ids: HashSet<Uuid> = t
            .teams
            .iter()
            .filter(|team| team.organization_id == id)
            .map(|team| team.id)
            .collect();
        if t.staff
            .iter()
            .any(|s| s.organization_id == id || team_ids.contains(&s.team_id))
        {
            return Err(broken("staff_organization_id_fkey"));
        }
        if t.events.iter().any(|e| e.organization_id == id) {
            return Err(broken("events_organization_id_fkey"));
        }
        let position_ids: HashSet<Uuid> = t
            .positions
            .iter()
            .filter(|p| p.organization_id == id)
            .map(|p| p.id)
            .collect();
        t.grants.retain(|g| !position_ids.contains(&g.position_id));
        t.positions.retain(|p| p.organization_id != id);
        t.teams.retain(|team| team.organization_id != id);
        t.type_links.retain(|(org, _)| *org != id);
        t.organizations.retain(|o| o.id != id);
        Ok(true)
    }

    async fn insert_organization_type(&self, org_type: &OrganizationType) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if t.organization_types
            .iter()
            .any(|ty| ty.id == org_type.id || ty.name == org_type.name)
        {
            return Err(conflict("organization_types_name_key"));
        }
        t.organization_types.push(org_type.clone());
        Ok(())
    }

    async fn find_organization_type(&self, id: Uuid) -> StoreResult<Option<OrganizationType>> {
        let t = self.tables.lock().await;
        Ok(t.organization_types.iter().find(|ty| ty.id == id).cloned())
    }

    async fn find_organization_type_by_name(&self, name: &str) -> StoreResult<Option<OrganizationType>> {
        let t = self.tables.lock().await;
        Ok(t.organization_types.iter().find(|ty| ty.name == name).cloned())
    }

    async fn list_organization_types(&self) -> StoreResult<Vec<OrganizationType>> {
        let t = self.tables.lock().await;
        Ok(t.organization_types.clone())
    }

    async fn update_organization_type(&self, org_type: &OrganizationType) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if t.organization_types
            .iter()
            .any(|ty| ty.id != org_type.id && ty.name == org_type.name)
        {
            return Err(conflict("organization_types_name_key"));
        }
        match t.organization_types.iter_mut().find(|ty| ty.id == org_type.id) {
            Some(row) => {
                *row = org_type.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_organization_type(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.organization_types.len();
        t.organization_types.retain(|ty| ty.id != id);
        t.type_links.retain(|(_, ty)| *ty != id);
        Ok(t.organization_types.len() != before)
    }

    async fn insert_team(&self, team: &Team) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if !t.has_organization(team.organization_id) {
            return Err(broken("teams_organization_id_fkey"));
        }
        t.teams.push(team.clone());
        Ok(())
    }

    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        let t = self.tables.lock().await;
        Ok(t.teams.iter().find(|team| team.id == id).cloned())
    }

    async fn find_team_by_name(&self, organization_id: Uuid, name: &str) -> StoreResult<Option<Team>> {
        let t = self.tables.lock().await;
        Ok(t.teams
            .iter()
            .find(|team| team.organization_id == organization_id && team.name == name)
            .cloned())
    }

    async fn list_teams_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Team>> {
        let t = self.tables.lock().await;
        Ok(t.teams
            .iter()
            .filter(|team| team.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn list_teams_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Team>> {
        let t = self.tables.lock().await;
        let staff_ids: HashSet<Uuid> = t
            .roster
            .iter()
            .filter(|r| r.event_id == event_id)
            .map(|r| r.staff_id)
            .collect();
        let team_ids: HashSet<Uuid> = t
            .staff
            .iter()
            .filter(|s| staff_ids.contains(&s.id))
            .map(|s| s.team_id)
            .collect();
        Ok(t.teams
            .iter()
            .filter(|team| team_ids.contains(&team.id))
            .cloned()
            .collect())
    }

    async fn update_team(&self, team: &Team) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t.teams.iter_mut().find(|row| row.id == team.id) {
            Some(row) => {
                *row = team.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.has_team(id) {
            return Ok(false);
        }
        if t.staff.iter().any(|s| s.team_id == id) {
            return Err(broken("staff_team_id_fkey"));
        }
        t.teams.retain(|team| team.id != id);
        Ok(true)
    }

    async fn insert_position(&self, detail: &PositionDetail) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        let position = &detail.position;
        if !t.has_organization(position.organization_id) {
            return Err(broken("positions_organization_id_fkey"));
        }
        if t.positions
            .iter()
            .any(|p| p.organization_id == position.organization_id && p.name == position.name)
        {
            return Err(conflict("positions_organization_id_name_key"));
        }
        t.positions.push(position.clone());
        let mut seen = HashSet::new();
        for grant in &detail.permissions {
            if seen.insert(grant.permission) {
                t.grants.push(grant.clone());
            }
        }
        Ok(())
    }

    async fn find_position(&self, id: Uuid) -> StoreResult<Option<PositionDetail>> {
        let t = self.tables.lock().await;
        Ok(t.positions
            .iter()
            .find(|p| p.id == id)
            .map(|p| t.position_detail(p)))
    }

    async fn find_position_by_name(&self, organization_id: Uuid, name: &str) -> StoreResult<Option<PositionDetail>> {
        let t = self.tables.lock().await;
        Ok(t.positions
            .iter()
            .find(|p| p.organization_id == organization_id && p.name == name)
            .map(|p| t.position_detail(p)))
    }

    async fn list_positions(&self, organization_id: Uuid) -> StoreResult<Vec<PositionDetail>> {
        let t = self.tables.lock().await;
        Ok(t.positions
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .map(|p| t.position_detail(p))
            .collect())
    }

    async fn rename_position(&self, id: Uuid, name: &str) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let Some(organization_id) = t.positions.iter().find(|p| p.id == id).map(|p| p.organization_id) else {
            return Ok(false);
        };
        if t.positions
            .iter()
            .any(|p| p.id != id && p.organization_id == organization_id && p.name == name)
        {
            return Err(conflict("positions_organization_id_name_key"));
        }
        if let Some(row) = t.positions.iter_mut().find(|p| p.id == id) {
            row.name = name.to_string();
        }
        Ok(true)
    }

    async fn grant_permissions(&self, grants: &[PermissionGrant]) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if grants.iter().any(|g| !t.has_position(g.position_id)) {
            return Err(broken("position_permissions_position_id_fkey"));
        }
        for grant in grants {
            let held = t
                .grants
                .iter()
                .any(|g| g.position_id == grant.position_id && g.permission == grant.permission);
            if !held {
                t.grants.push(grant.clone());
            }
        }
        Ok(())
    }

    async fn revoke_permissions(&self, position_id: Uuid, permissions: &[Permission]) -> StoreResult<u64> {
        let mut t = self.tables.lock().await;
        let before = t.grants.len();
        t.grants
            .retain(|g| !(g.position_id == position_id && permissions.contains(&g.permission)));
        Ok((before - t.grants.len()) as u64)
    }

    async fn delete_position(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.has_position(id) {
            return Ok(false);
        }
        for staff in t.staff.iter_mut().filter(|s| s.position_id == Some(id)) {
            staff.position_id = None;
        }
        t.grants.retain(|g| g.position_id != id);
        t.positions.retain(|p| p.id != id);
        Ok(true)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &Event, creator: &StaffEvent, steps: &[StepBundle]) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if t.has_event(event.id) {
            return Err(conflict("events_pkey"));
        }
        if !t.has_organization(event.organization_id) {
            return Err(broken("events_organization_id_fkey"));
        }
        if creator.event_id != event.id || !t.has_staff(creator.staff_id) {
            return Err(broken("staff_events_staff_id_fkey"));
        }
        let mut levels = HashSet::new();
        for bundle in steps {
            if bundle.step.event_id != event.id {
                return Err(broken("steps_event_id_fkey"));
            }
            if !levels.insert(bundle.step.level) {
                return Err(conflict("steps_event_id_level_key"));
            }
            t.check_bundle(bundle)?;
        }

        t.events.push(event.clone());
        t.roster.push(creator.clone());
        for bundle in steps {
            t.write_bundle(bundle);
        }
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let t = self.tables.lock().await;
        Ok(t.events.iter().find(|e| e.id == id).cloned())
    }

    async fn update_event(&self, event: &Event) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.has_organization(event.organization_id) {
            return Err(broken("events_organization_id_fkey"));
        }
        match t.events.iter_mut().find(|e| e.id == event.id) {
            Some(row) => {
                *row = event.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.has_event(id) {
            return Ok(false);
        }
        let step_ids: HashSet<Uuid> = t
            .steps
            .iter()
            .filter(|s| s.event_id == id)
            .map(|s| s.id)
            .collect();
        t.remove_steps(&step_ids);
        t.roster.retain(|r| r.event_id != id);
        t.events.retain(|e| e.id != id);
        Ok(true)
    }

    async fn list_roster(&self, event_id: Uuid) -> StoreResult<Vec<StaffEvent>> {
        let t = self.tables.lock().await;
        Ok(t.roster
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn insert_roster(&self, rows: &[StaffEvent]) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        let mut pairs = HashSet::new();
        for row in rows {
            if !t.has_event(row.event_id) {
                return Err(broken("staff_events_event_id_fkey"));
            }
            if !t.has_staff(row.staff_id) {
                return Err(broken("staff_events_staff_id_fkey"));
            }
            let taken = t
                .roster
                .iter()
                .any(|r| r.staff_id == row.staff_id && r.event_id == row.event_id);
            if taken || !pairs.insert((row.staff_id, row.event_id)) {
                return Err(conflict("staff_events_staff_id_event_id_key"));
            }
        }
        t.roster.extend(rows.iter().cloned());
        Ok(())
    }

    async fn set_invitation_status(&self, staff_id: Uuid, event_id: Uuid, status: InviteStatus) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t
            .roster
            .iter_mut()
            .find(|r| r.staff_id == staff_id && r.event_id == event_id)
        {
            Some(row) => {
                row.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_from_event(&self, staff_id: Uuid, event_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.roster.len();
        t.roster
            .retain(|r| !(r.staff_id == staff_id && r.event_id == event_id));
        if t.roster.len() == before {
            return Ok(false);
        }
        let step_ids: HashSet<Uuid> = t
            .steps
            .iter()
            .filter(|s| s.event_id == event_id)
            .map(|s| s.id)
            .collect();
        t.step_staff
            .retain(|r| !(r.staff_id == staff_id && step_ids.contains(&r.step_id)));
        Ok(true)
    }

    async fn list_invitations(&self, staff_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let t = self.tables.lock().await;
        Ok(t.roster
            .iter()
            .filter(|r| r.staff_id == staff_id)
            .filter_map(|r| {
                t.events.iter().find(|e| e.id == r.event_id).map(|event| Invitation {
                    invitation: r.clone(),
                    event: event.clone(),
                })
            })
            .collect())
    }

    async fn list_events_by_role(&self, staff_id: Uuid, role: StaffRole) -> StoreResult<Vec<Event>> {
        let t = self.tables.lock().await;
        let ids: HashSet<Uuid> = t
            .roster
            .iter()
            .filter(|r| r.staff_id == staff_id && r.staff_role == role)
            .map(|r| r.event_id)
            .collect();
        Ok(t.events_where(|_| false, |e| ids.contains(&e.id)))
    }

    async fn list_events_by_team(&self, team_id: Uuid) -> StoreResult<Vec<Event>> {
        let t = self.tables.lock().await;
        Ok(t.events_where(|s| s.team_id == team_id, |_| false))
    }

    async fn list_events_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Event>> {
        let t = self.tables.lock().await;
        Ok(t.events_where(
            |s| s.organization_id == organization_id,
            |e| e.organization_id == organization_id,
        ))
    }

    async fn staff_score(&self, event_id: Uuid, staff_id: Uuid) -> StoreResult<i64> {
        let t = self.tables.lock().await;
        let step_ids: HashSet<Uuid> = t
            .steps
            .iter()
            .filter(|s| s.event_id == event_id)
            .map(|s| s.id)
            .collect();
        Ok(t.step_staff
            .iter()
            .filter(|r| r.staff_id == staff_id && step_ids.contains(&r.step_id))
            .map(|r| i64::from(r.score))
            .sum())
    }
}

#[async_trait]
impl StepStore for MemoryStore {
    async fn insert_step(&self, bundle: &StepBundle) -> StoreResult<Step> {
        let mut t = self.tables.lock().await;
        let event_id = bundle.step.event_id;
        if !t.has_event(event_id) {
            return Err(broken("steps_event_id_fkey"));
        }
        t.check_bundle(bundle)?;
        let level = t
            .steps
            .iter()
            .filter(|s| s.event_id == event_id)
            .map(|s| s.level)
            .max()
            .unwrap_or(0)
            + 1;
        let mut stored = bundle.clone();
        stored.step.level = level;
        t.write_bundle(&stored);
        Ok(stored.step)
    }

    async fn find_step(&self, id: Uuid) -> StoreResult<Option<Step>> {
        let t = self.tables.lock().await;
        Ok(t.steps.iter().find(|s| s.id == id).cloned())
    }

    async fn list_steps(&self, event_id: Uuid) -> StoreResult<Vec<Step>> {
        let t = self.tables.lock().await;
        let mut steps: Vec<Step> = t
            .steps
            .iter()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.level);
        Ok(steps)
    }

    async fn list_step_images(&self, step_id: Uuid) -> StoreResult<Vec<StepImage>> {
        let t = self.tables.lock().await;
        Ok(t.step_images
            .iter()
            .filter(|i| i.step_id == step_id)
            .cloned()
            .collect())
    }

    async fn update_step(&self, step: &Step, new_images: &[StepImage]) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let open = t
            .steps
            .iter()
            .any(|s| s.id == step.id && !s.status.is_terminal());
        if !open {
            return Ok(false);
        }
        if new_images.iter().any(|i| i.step_id != step.id) {
            return Err(broken("step_images_step_id_fkey"));
        }
        if let Some(row) = t.steps.iter_mut().find(|s| s.id == step.id) {
            *row = step.clone();
        }
        t.step_images.extend(new_images.iter().cloned());
        Ok(true)
    }

    async fn close_step(&self, id: Uuid, to: StepStatus) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t
            .steps
            .iter_mut()
            .find(|s| s.id == id && !s.status.is_terminal())
        {
            Some(row) => {
                row.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_step(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.has_step(id) {
            return Ok(false);
        }
        t.remove_steps(&HashSet::from([id]));
        Ok(true)
    }

    async fn insert_step_staff(&self, row: &StepStaff) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if !t.has_step(row.step_id) {
            return Err(broken("step_staff_step_id_fkey"));
        }
        if !t.has_staff(row.staff_id) {
            return Err(broken("step_staff_staff_id_fkey"));
        }
        if t.step_staff
            .iter()
            .any(|r| r.staff_id == row.staff_id && r.step_id == row.step_id)
        {
            return Err(conflict("step_staff_staff_id_step_id_key"));
        }
        t.step_staff.push(row.clone());
        Ok(())
    }

    async fn list_step_staff(&self, step_id: Uuid) -> StoreResult<Vec<StepStaff>> {
        let t = self.tables.lock().await;
        Ok(t.step_staff
            .iter()
            .filter(|r| r.step_id == step_id)
            .cloned()
            .collect())
    }

    async fn record_result(
        &self,
        staff_id: Uuid,
        step_id: Uuid,
        accomplishment: Accomplishment,
        score: i32,
        advance: Option<&StepStaff>,
    ) -> StoreResult<Option<StepStaff>> {
        let mut t = self.tables.lock().await;
        if !t
            .step_staff
            .iter()
            .any(|r| r.staff_id == staff_id && r.step_id == step_id)
        {
            return Ok(None);
        }
        let advance = match advance {
            Some(next) => {
                if !t.has_step(next.step_id) {
                    return Err(broken("step_staff_step_id_fkey"));
                }
                let enrolled = t
                    .step_staff
                    .iter()
                    .any(|r| r.staff_id == next.staff_id && r.step_id == next.step_id);
                (!enrolled).then(|| next.clone())
            }
            None => None,
        };

        let mut updated = None;
        if let Some(row) = t
            .step_staff
            .iter_mut()
            .find(|r| r.staff_id == staff_id && r.step_id == step_id)
        {
            row.accomplishment = accomplishment;
            row.score = score;
            updated = Some(row.clone());
        }
        if let Some(next) = advance {
            t.step_staff.push(next);
        }
        Ok(updated)
    }

    async fn finish_due_steps(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut t = self.tables.lock().await;
        let mut finished = 0;
        for step in t
            .steps
            .iter_mut()
            .filter(|s| !s.status.is_terminal() && s.end_date <= now)
        {
            step.status = StepStatus::Finished;
            finished += 1;
        }
        Ok(finished)
    }
}

#[async_trait]
impl PrizeStore for MemoryStore {
    async fn insert_prize(&self, prize: &Prize) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if !t.has_step(prize.step_id) {
            return Err(broken("prizes_step_id_fkey"));
        }
        t.prizes.push(prize.clone());
        Ok(())
    }

    async fn find_prize(&self, id: Uuid) -> StoreResult<Option<Prize>> {
        let t = self.tables.lock().await;
        Ok(t.prizes.iter().find(|p| p.id == id).cloned())
    }

    async fn list_prizes(&self) -> StoreResult<Vec<Prize>> {
        let t = self.tables.lock().await;
        Ok(t.prizes.clone())
    }

    async fn list_prizes_by_step(&self, step_id: Uuid) -> StoreResult<Vec<Prize>> {
        let t = self.tables.lock().await;
        Ok(t.prizes.iter().filter(|p| p.step_id == step_id).cloned().collect())
    }

    async fn list_prizes_by_creator(&self, staff_id: Uuid) -> StoreResult<Vec<Prize>> {
        let t = self.tables.lock().await;
        Ok(t.prizes
            .iter()
            .filter(|p| p.created_by == staff_id)
            .cloned()
            .collect())
    }

    async fn list_prizes_by_type(&self, prize_type: PrizeType) -> StoreResult<Vec<Prize>> {
        let t = self.tables.lock().await;
        Ok(t.prizes
            .iter()
            .filter(|p| p.prize_type == prize_type)
            .cloned()
            .collect())
    }

    async fn update_prize(&self, prize: &Prize) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t.prizes.iter_mut().find(|p| p.id == prize.id) {
            Some(row) => {
                row.name = prize.name.clone();
                row.description = prize.description.clone();
                row.data = prize.data.clone();
                row.prize_type = prize.prize_type;
                row.prize_status = prize.prize_status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_prize(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.prizes.len();
        t.prizes.retain(|p| p.id != id);
        t.staff_prizes.retain(|a| a.prize_id != id);
        Ok(t.prizes.len() != before)
    }

    async fn award_prize(&self, award: &StaffPrize) -> StoreResult<AwardOutcome> {
        let mut t = self.tables.lock().await;
        if !t.has_staff(award.staff_id) {
            return Err(broken("staff_prizes_staff_id_fkey"));
        }
        let Some(prize) = t.prizes.iter_mut().find(|p| p.id == award.prize_id) else {
            return Ok(AwardOutcome::Missing);
        };
        if prize.current_count <= 0 {
            return Ok(AwardOutcome::Exhausted);
        }
        prize.current_count -= 1;
        let prize = prize.clone();
        t.staff_prizes.push(award.clone());
        Ok(AwardOutcome::Awarded {
            prize,
            award: award.clone(),
        })
    }

    async fn list_staff_prizes(&self, staff_id: Uuid) -> StoreResult<Vec<AwardedPrize>> {
        let t = self.tables.lock().await;
        Ok(t.staff_prizes
            .iter()
            .filter(|a| a.staff_id == staff_id)
            .filter_map(|a| {
                t.prizes.iter().find(|p| p.id == a.prize_id).map(|p| AwardedPrize {
                    award_id: a.id,
                    awarded_at: a.awarded_at,
                    prize: p.clone(),
                })
            })
            .collect())
    }
}
