use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{
    Membership, Organization, OrganizationDetail, OrganizationType, PositionDetail, Staff, Team,
    DEFAULT_MEMBERSHIP_NAME, TYPE_DEVELOPER, TYPE_NONE,
};
use crate::database::store::*;
use crate::database::DatabaseError;
use crate::permissions::Permission;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::position_service::{parse_permissions, position_with};
use crate::services::team_service::NewTeam;
use crate::services::validation::{require_text, validate_uri};

/// Roles every `developer` organization starts with.
pub const DEVELOPER_POSITIONS: &[&str] = &[
    "developer",
    "hr",
    "project manager",
    "quality assurance",
    "delivery manager",
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionSeed {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub website_url: String,
    pub image: Option<String>,
    /// Organization type names.
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub positions: Vec<PositionSeed>,
    #[serde(default)]
    pub teams: Vec<NewTeam>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberAssignment {
    pub staff_id: Uuid,
    pub team_id: Uuid,
    pub position_id: Option<Uuid>,
}

/// Organizations, their types and their membership.
#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn Store>,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates an organization with everything it is provisioned with:
    /// type links, positions (including the ones its types imply) and teams.
    pub async fn create_organization(&self, new: NewOrganization, actor: Option<Uuid>) -> ServiceResult<OrganizationDetail> {
        require_text("name", &new.name)?;
        validate_uri("website_url", &new.website_url)?;

        let mut type_names = new.types.clone();
        if type_names.is_empty() {
            type_names.push(TYPE_NONE.to_string());
        }
        let mut types = Vec::with_capacity(type_names.len());
        for name in &type_names {
            match self.store.find_organization_type_by_name(name).await? {
                Some(org_type) if !types.contains(&org_type) => types.push(org_type),
                Some(_) => {}
                None => return Err(ServiceError::NotFound(format!("organization type '{}' not found", name))),
            }
        }

        let organization = Organization {
            id: Uuid::new_v4(),
            name: new.name,
            website_url: new.website_url,
            image: new.image,
            created_by: actor,
            created_at: Utc::now(),
        };
        let id = organization.id;

        let mut positions: Vec<PositionDetail> = Vec::new();
        for seed in &new.positions {
            require_text("positions", &seed.name)?;
            let permissions = parse_permissions(&seed.permissions)?;
            positions.push(position_with(id, seed.name.trim(), &permissions, actor));
        }
        let has_type = |name: &str| types.iter().any(|t| t.name == name);
        if has_type(TYPE_NONE) && positions.is_empty() {
            positions.push(position_with(id, DEFAULT_MEMBERSHIP_NAME, Permission::ALL, actor));
        }
        if has_type(TYPE_DEVELOPER) {
            for name in DEVELOPER_POSITIONS {
                if !positions.iter().any(|p| p.position.name == *name) {
                    positions.push(position_with(id, name, Permission::EVENT_MANAGEMENT, actor));
                }
            }
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = positions.iter().find(|p| !seen.insert(p.position.name.as_str())) {
            return Err(ServiceError::validation(
                "positions",
                format!("position '{}' is listed twice", duplicate.position.name),
            ));
        }

        let mut teams: Vec<Team> = Vec::with_capacity(new.teams.len() + 1);
        for seed in &new.teams {
            require_text("teams", &seed.name)?;
            teams.push(Team {
                id: Uuid::new_v4(),
                organization_id: id,
                name: seed.name.clone(),
                description: seed.description.clone(),
                created_at: Utc::now(),
            });
        }
        if teams.is_empty() {
            teams.push(Team {
                id: Uuid::new_v4(),
                organization_id: id,
                name: DEFAULT_MEMBERSHIP_NAME.to_string(),
                description: None,
                created_at: Utc::now(),
            });
        }

        let detail = OrganizationDetail {
            organization,
            types,
            positions,
            teams,
        };
        self.store.insert_organization(&detail).await?;
        info!(
            "Created organization {} with {} positions and {} teams",
            id,
            detail.positions.len(),
            detail.teams.len()
        );
        Ok(detail)
    }

    pub async fn get_organization(&self, id: Uuid) -> ServiceResult<OrganizationDetail> {
        let organization = self.load_organization(id).await?;
        let types = self.store.list_types_of_organization(id).await?;
        let positions = self.store.list_positions(id).await?;
        let teams = self.store.list_teams_by_organization(id).await?;
        Ok(OrganizationDetail {
            organization,
            types,
            positions,
            teams,
        })
    }

    pub async fn get_organizations(&self) -> ServiceResult<Vec<Organization>> {
        Ok(self.store.list_organizations().await?)
    }

    pub async fn update_organization(&self, id: Uuid, patch: OrganizationPatch) -> ServiceResult<Organization> {
        let mut organization = self.load_organization(id).await?;
        if let Some(name) = patch.name.filter(|n| !n.trim().is_empty()) {
            organization.name = name;
        }
        if let Some(url) = patch.website_url {
            validate_uri("website_url", &url)?;
            organization.website_url = url;
        }
        if let Some(image) = patch.image {
            organization.image = Some(image);
        }
        if !self.store.update_organization(&organization).await? {
            return Err(ServiceError::not_found("organization", id));
        }
        Ok(organization)
    }

    /// Only organizations nobody works in and no event belongs to can go.
    pub async fn delete_organization(&self, id: Uuid) -> ServiceResult<()> {
        let deleted = self.store.delete_organization(id).await.map_err(|err| match err {
            DatabaseError::ForeignKey(_) => {
                ServiceError::Conflict(format!("organization {} still has staff or events", id))
            }
            other => other.into(),
        })?;
        if !deleted {
            return Err(ServiceError::not_found("organization", id));
        }
        info!("Deleted organization {}", id);
        Ok(())
    }

    /// Moves staff into the organization. Every team and position must belong to it.
    pub async fn add_staff(&self, id: Uuid, members: Vec<MemberAssignment>) -> ServiceResult<Vec<Staff>> {
        self.load_organization(id).await?;

        let mut memberships = Vec::with_capacity(members.len());
        for member in &members {
            match self.store.find_team(member.team_id).await? {
                Some(team) if team.organization_id == id => {}
                Some(_) => return Err(ServiceError::validation("team_id", "team belongs to another organization")),
                None => return Err(ServiceError::not_found("team", member.team_id)),
            }
            if let Some(position_id) = member.position_id {
                match self.store.find_position(position_id).await? {
                    Some(p) if p.position.organization_id == id => {}
                    Some(_) => {
                        return Err(ServiceError::validation(
                            "position_id",
                            "position belongs to another organization",
                        ))
                    }
                    None => return Err(ServiceError::not_found("position", position_id)),
                }
            }
            if self.store.find_staff(member.staff_id).await?.is_none() {
                return Err(ServiceError::not_found("staff", member.staff_id));
            }
            memberships.push(Membership {
                staff_id: member.staff_id,
                organization_id: id,
                team_id: member.team_id,
                position_id: member.position_id,
            });
        }

        self.store.apply_memberships(&memberships).await?;
        info!("Moved {} staff into organization {}", memberships.len(), id);

        let mut moved = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            if let Some(staff) = self.store.find_staff(membership.staff_id).await? {
                moved.push(staff);
            }
        }
        Ok(moved)
    }

    pub async fn create_type(&self, name: &str) -> ServiceResult<OrganizationType> {
        require_text("name", name)?;
        let org_type = OrganizationType {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
        };
        self.store.insert_organization_type(&org_type).await?;
        Ok(org_type)
    }

    pub async fn get_type(&self, id: Uuid) -> ServiceResult<OrganizationType> {
        self.store
            .find_organization_type(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("organization type", id))
    }

    pub async fn get_types(&self) -> ServiceResult<Vec<OrganizationType>> {
        Ok(self.store.list_organization_types().await?)
    }

    pub async fn update_type(&self, id: Uuid, name: &str) -> ServiceResult<OrganizationType> {
        require_text("name", name)?;
        let org_type = OrganizationType {
            id,
            name: name.trim().to_string(),
        };
        if !self.store.update_organization_type(&org_type).await? {
            return Err(ServiceError::not_found("organization type", id));
        }
        Ok(org_type)
    }

    pub async fn delete_type(&self, id: Uuid) -> ServiceResult<()> {
        if !self.store.delete_organization_type(id).await? {
            return Err(ServiceError::not_found("organization type", id));
        }
        Ok(())
    }

    async fn load_organization(&self, id: Uuid) -> ServiceResult<Organization> {
        self.store
            .find_organization(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("organization", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn new_org(name: &str, types: &[&str]) -> NewOrganization {
        NewOrganization {
            name: name.to_string(),
            website_url: "https://example.com".into(),
            types: types.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn untyped_organizations_get_an_all_powerful_default_position() {
        let ctx = TestContext::new().await;
        let detail = ctx
            .services
            .organizations
            .create_organization(new_org("Plain", &[]), None)
            .await
            .unwrap();

        assert_eq!(detail.types.len(), 1);
        assert_eq!(detail.types[0].name, TYPE_NONE);
        assert_eq!(detail.positions.len(), 1);
        assert_eq!(detail.positions[0].position.name, DEFAULT_MEMBERSHIP_NAME);
        assert_eq!(detail.positions[0].permissions.len(), Permission::ALL.len());
        assert_eq!(detail.teams.len(), 1);
    }

    #[tokio::test]
    async fn developer_organizations_seed_event_managers() {
        let ctx = TestContext::new().await;
        let detail = ctx
            .services
            .organizations
            .create_organization(new_org("Studio", &["developer"]), None)
            .await
            .unwrap();

        let names: Vec<&str> = detail.positions.iter().map(|p| p.position.name.as_str()).collect();
        assert_eq!(names, DEVELOPER_POSITIONS.to_vec());
        for position in &detail.positions {
            for permission in Permission::EVENT_MANAGEMENT {
                assert!(position.has_permission(*permission));
            }
            assert!(!position.has_permission(Permission::PrizeGive));
        }

        let stored = ctx.services.organizations.get_organization(detail.organization.id).await.unwrap();
        assert_eq!(stored.positions.len(), DEVELOPER_POSITIONS.len());
    }

    #[tokio::test]
    async fn explicit_positions_replace_the_default_one() {
        let ctx = TestContext::new().await;
        let mut new = new_org("Custom", &["none"]);
        new.positions.push(PositionSeed {
            name: "boss".into(),
            permissions: vec!["event-create".into()],
        });
        let detail = ctx
            .services
            .organizations
            .create_organization(new, None)
            .await
            .unwrap();
        assert_eq!(detail.positions.len(), 1);
        assert_eq!(detail.positions[0].position.name, "boss");
    }

    #[tokio::test]
    async fn unknown_types_and_bad_urls_are_rejected() {
        let ctx = TestContext::new().await;
        let orgs = &ctx.services.organizations;
        assert!(matches!(
            orgs.create_organization(new_org("Typo", &["startup"]), None).await,
            Err(ServiceError::NotFound(_))
        ));
        let mut bad_url = new_org("Offline", &[]);
        bad_url.website_url = "not a url".into();
        assert!(matches!(
            orgs.create_organization(bad_url, None).await,
            Err(ServiceError::Validation { field: "website_url", .. })
        ));
    }

    #[tokio::test]
    async fn adding_staff_requires_teams_and_positions_of_the_organization() {
        let ctx = TestContext::new().await;
        let target = ctx.organization("Target").await;
        let elsewhere = ctx.organization("Elsewhere").await;
        let recruit = ctx.staff("recruit").await;
        let orgs = &ctx.services.organizations;

        let err = orgs
            .add_staff(
                target.organization.id,
                vec![MemberAssignment {
                    staff_id: recruit.id,
                    team_id: elsewhere.teams[0].id,
                    position_id: None,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "team_id", .. }));

        let moved = orgs
            .add_staff(
                target.organization.id,
                vec![MemberAssignment {
                    staff_id: recruit.id,
                    team_id: target.teams[0].id,
                    position_id: Some(target.positions[0].position.id),
                }],
            )
            .await
            .unwrap();
        assert_eq!(moved[0].organization_id, target.organization.id);

        let members = ctx
            .services
            .staff
            .get_staff_by_organization(target.organization.id)
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn organizations_in_use_cannot_be_deleted() {
        let ctx = TestContext::new().await;
        let org = ctx.organization("Busy").await;
        let member = ctx.staff_in(org.organization.id, org.teams[0].id).await;
        let orgs = &ctx.services.organizations;

        let err = orgs.delete_organization(org.organization.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        ctx.services.staff.delete_staff(member.id).await.unwrap();
        orgs.delete_organization(org.organization.id).await.unwrap();
        assert!(matches!(
            orgs.get_organization(org.organization.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn organization_types_are_managed() {
        let ctx = TestContext::new().await;
        let orgs = &ctx.services.organizations;
        let created = orgs.create_type("nonprofit").await.unwrap();
        assert!(matches!(orgs.create_type("nonprofit").await, Err(ServiceError::Conflict(_))));

        let renamed = orgs.update_type(created.id, "charity").await.unwrap();
        assert_eq!(orgs.get_type(created.id).await.unwrap(), renamed);
        orgs.delete_type(created.id).await.unwrap();
        assert!(orgs.get_types().await.unwrap().iter().all(|t| t.id != created.id));
    }
}
