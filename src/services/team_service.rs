use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::bootstrap::Defaults;
use crate::database::models::Team;
use crate::database::store::*;
use crate::database::DatabaseError;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::validation::require_text;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTeam {
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct TeamService {
    store: Arc<dyn Store>,
    defaults: Defaults,
}

impl TeamService {
    pub fn new(store: Arc<dyn Store>, defaults: Defaults) -> Self {
        Self { store, defaults }
    }

    pub async fn create_team(&self, new: NewTeam) -> ServiceResult<Team> {
        require_text("name", &new.name)?;
        let organization_id = new.organization_id.unwrap_or(self.defaults.organization_id);
        if self.store.find_organization(organization_id).await?.is_none() {
            return Err(ServiceError::not_found("organization", organization_id));
        }
        let team = Team {
            id: Uuid::new_v4(),
            organization_id,
            name: new.name,
            description: new.description,
            created_at: Utc::now(),
        };
        self.store.insert_team(&team).await?;
        Ok(team)
    }

    pub async fn get_team(&self, id: Uuid) -> ServiceResult<Team> {
        self.store
            .find_team(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("team", id))
    }

    pub async fn get_teams_by_organization(&self, organization_id: Uuid) -> ServiceResult<Vec<Team>> {
        Ok(self.store.list_teams_by_organization(organization_id).await?)
    }

    /// Teams represented on an event's roster.
    pub async fn get_teams_by_event(&self, event_id: Uuid) -> ServiceResult<Vec<Team>> {
        if self.store.find_event(event_id).await?.is_none() {
            return Err(ServiceError::not_found("event", event_id));
        }
        Ok(self.store.list_teams_by_event(event_id).await?)
    }

    pub async fn update_team(&self, id: Uuid, patch: TeamPatch) -> ServiceResult<Team> {
        let mut team = self.get_team(id).await?;
        if let Some(name) = patch.name.filter(|n| !n.trim().is_empty()) {
            team.name = name;
        }
        if let Some(description) = patch.description {
            team.description = Some(description);
        }
        if !self.store.update_team(&team).await? {
            return Err(ServiceError::not_found("team", id));
        }
        Ok(team)
    }

    pub async fn delete_team(&self, id: Uuid) -> ServiceResult<()> {
        if id == self.defaults.team_id {
            return Err(ServiceError::Conflict("the default team cannot be deleted".to_string()));
        }
        let deleted = self.store.delete_team(id).await.map_err(|err| match err {
            DatabaseError::ForeignKey(_) => ServiceError::Conflict(format!("team {} still has members", id)),
            other => other.into(),
        })?;
        if !deleted {
            return Err(ServiceError::not_found("team", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::event_service::InviteRequest;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn teams_default_to_the_default_organization() {
        let ctx = TestContext::new().await;
        let team = ctx
            .services
            .teams
            .create_team(NewTeam {
                name: "blue".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(team.organization_id, ctx.defaults.organization_id);

        let teams = ctx
            .services
            .teams
            .get_teams_by_organization(ctx.defaults.organization_id)
            .await
            .unwrap();
        assert!(teams.iter().any(|t| t.id == team.id));
    }

    #[tokio::test]
    async fn event_teams_come_from_the_roster() {
        let ctx = TestContext::new().await;
        let org = ctx.organization("Roster").await;
        let red = ctx.team(org.organization.id, "red").await;
        let creator = ctx.staff_in(org.organization.id, red.id).await;
        let guest = ctx.staff("guest").await;
        let event = ctx.event(creator.id, None).await;
        ctx.services
            .events
            .assign_staff(
                event.event.id,
                vec![InviteRequest {
                    staff_id: guest.id,
                    staff_role: None,
                }],
            )
            .await
            .unwrap();

        let teams = ctx.services.teams.get_teams_by_event(event.event.id).await.unwrap();
        let mut ids: Vec<Uuid> = teams.iter().map(|t| t.id).collect();
        ids.sort();
        let mut expected = vec![red.id, ctx.defaults.team_id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn teams_with_members_stay() {
        let ctx = TestContext::new().await;
        let org = ctx.organization("Sticky").await;
        let team = ctx.team(org.organization.id, "glue").await;
        ctx.staff_in(org.organization.id, team.id).await;

        let err = ctx.services.teams.delete_team(team.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let renamed = ctx
            .services
            .teams
            .update_team(
                team.id,
                TeamPatch {
                    name: Some("superglue".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "superglue");
    }
}
