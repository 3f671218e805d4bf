use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::PgStore;
use crate::database::models::{
    Organization, OrganizationDetail, OrganizationType, PermissionGrant, Position, PositionDetail, Team,
};
use crate::database::store::{OrganizationStore, StoreResult};
use crate::permissions::Permission;

const ORGANIZATION_COLUMNS: &str = "id, name, website_url, image, created_by, created_at";
const TEAM_COLUMNS: &str = "t.id, t.organization_id, t.name, t.description, t.created_at";
const POSITION_COLUMNS: &str = "id, organization_id, name, created_at";

async fn write_position(tx: &mut Transaction<'_, Postgres>, detail: &PositionDetail) -> StoreResult<()> {
    let position = &detail.position;
    sqlx::query("INSERT INTO positions (id, organization_id, name, created_at) VALUES ($1, $2, $3, $4)")
        .bind(position.id)
        .bind(position.organization_id)
        .bind(&position.name)
        .bind(position.created_at)
        .execute(&mut **tx)
        .await?;
    write_grants(tx, &detail.permissions).await
}

async fn write_grants(tx: &mut Transaction<'_, Postgres>, grants: &[PermissionGrant]) -> StoreResult<()> {
    for grant in grants {
        sqlx::query(
            "INSERT INTO position_permissions (position_id, permission, granted_by) VALUES ($1, $2, $3) \
             ON CONFLICT (position_id, permission) DO NOTHING",
        )
        .bind(grant.position_id)
        .bind(grant.permission)
        .bind(grant.granted_by)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

impl PgStore {
    /// Attaches grants to already loaded positions.
    async fn with_grants(&self, positions: Vec<Position>) -> StoreResult<Vec<PositionDetail>> {
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = positions.iter().map(|p| p.id).collect();
        let grants = sqlx::query_as::<_, PermissionGrant>(
            "SELECT position_id, permission, granted_by FROM position_permissions WHERE position_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_position: HashMap<Uuid, Vec<PermissionGrant>> = HashMap::new();
        for grant in grants {
            by_position.entry(grant.position_id).or_default().push(grant);
        }
        Ok(positions
            .into_iter()
            .map(|position| PositionDetail {
                permissions: by_position.remove(&position.id).unwrap_or_default(),
                position,
            })
            .collect())
    }
}

#[async_trait]
impl OrganizationStore for PgStore {
    async fn insert_organization(&self, detail: &OrganizationDetail) -> StoreResult<()> {
        let org = &detail.organization;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO organizations (id, name, website_url, image, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.website_url)
        .bind(&org.image)
        .bind(org.created_by)
        .bind(org.created_at)
        .execute(&mut *tx)
        .await?;

        for org_type in &detail.types {
            sqlx::query("INSERT INTO organization_type_links (organization_id, type_id) VALUES ($1, $2)")
                .bind(org.id)
                .bind(org_type.id)
                .execute(&mut *tx)
                .await?;
        }

        for position in &detail.positions {
            write_position(&mut tx, position).await?;
        }

        for team in &detail.teams {
            sqlx::query(
                "INSERT INTO teams (id, organization_id, name, description, created_at) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(team.id)
            .bind(team.organization_id)
            .bind(&team.name)
            .bind(&team.description)
            .bind(team.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let sql = format!("SELECT {} FROM organizations WHERE id = $1", ORGANIZATION_COLUMNS);
        Ok(sqlx::query_as::<_, Organization>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_organization_by_name(&self, name: &str) -> StoreResult<Option<Organization>> {
        let sql = format!(
            "SELECT {} FROM organizations WHERE name = $1 ORDER BY created_at LIMIT 1",
            ORGANIZATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Organization>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        let sql = format!("SELECT {} FROM organizations ORDER BY created_at", ORGANIZATION_COLUMNS);
        Ok(sqlx::query_as::<_, Organization>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_types_of_organization(&self, organization_id: Uuid) -> StoreResult<Vec<OrganizationType>> {
        Ok(sqlx::query_as::<_, OrganizationType>(
            "SELECT ot.id, ot.name FROM organization_types ot \
             JOIN organization_type_links l ON l.type_id = ot.id WHERE l.organization_id = $1 ORDER BY ot.name",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_organization(&self, organization: &Organization) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE organizations SET name = $2, website_url = $3, image = $4 WHERE id = $1")
            .bind(organization.id)
            .bind(&organization.name)
            .bind(&organization.website_url)
            .bind(&organization.image)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_organization(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_organization_type(&self, org_type: &OrganizationType) -> StoreResult<()> {
        sqlx::query("INSERT INTO organization_types (id, name) VALUES ($1, $2)")
            .bind(org_type.id)
            .bind(&org_type.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_organization_type(&self, id: Uuid) -> StoreResult<Option<OrganizationType>> {
        Ok(sqlx::query_as::<_, OrganizationType>("SELECT id, name FROM organization_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_organization_type_by_name(&self, name: &str) -> StoreResult<Option<OrganizationType>> {
        Ok(sqlx::query_as::<_, OrganizationType>("SELECT id, name FROM organization_types WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_organization_types(&self) -> StoreResult<Vec<OrganizationType>> {
        Ok(sqlx::query_as::<_, OrganizationType>("SELECT id, name FROM organization_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_organization_type(&self, org_type: &OrganizationType) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE organization_types SET name = $2 WHERE id = $1")
            .bind(org_type.id)
            .bind(&org_type.name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_organization_type(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM organization_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_team(&self, team: &Team) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO teams (id, organization_id, name, description, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(team.id)
        .bind(team.organization_id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(team.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        let sql = format!("SELECT {} FROM teams t WHERE t.id = $1", TEAM_COLUMNS);
        Ok(sqlx::query_as::<_, Team>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_team_by_name(&self, organization_id: Uuid, name: &str) -> StoreResult<Option<Team>> {
        let sql = format!(
            "SELECT {} FROM teams t WHERE t.organization_id = $1 AND t.name = $2 ORDER BY t.created_at LIMIT 1",
            TEAM_COLUMNS
        );
        Ok(sqlx::query_as::<_, Team>(&sql)
            .bind(organization_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_teams_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Team>> {
        let sql = format!(
            "SELECT {} FROM teams t WHERE t.organization_id = $1 ORDER BY t.name",
            TEAM_COLUMNS
        );
        Ok(sqlx::query_as::<_, Team>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_teams_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Team>> {
        let sql = format!(
            "SELECT DISTINCT {} FROM teams t \
             JOIN staff s ON s.team_id = t.id \
             JOIN staff_events se ON se.staff_id = s.id \
             WHERE se.event_id = $1",
            TEAM_COLUMNS
        );
        Ok(sqlx::query_as::<_, Team>(&sql)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_team(&self, team: &Team) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE teams SET name = $2, description = $3 WHERE id = $1")
            .bind(team.id)
            .bind(&team.name)
            .bind(&team.description)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_position(&self, detail: &PositionDetail) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        write_position(&mut tx, detail).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_position(&self, id: Uuid) -> StoreResult<Option<PositionDetail>> {
        let sql = format!("SELECT {} FROM positions WHERE id = $1", POSITION_COLUMNS);
        let positions = sqlx::query_as::<_, Position>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(self.with_grants(positions).await?.into_iter().next())
    }

    async fn find_position_by_name(&self, organization_id: Uuid, name: &str) -> StoreResult<Option<PositionDetail>> {
        let sql = format!(
            "SELECT {} FROM positions WHERE organization_id = $1 AND name = $2",
            POSITION_COLUMNS
        );
        let positions = sqlx::query_as::<_, Position>(&sql)
            .bind(organization_id)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        Ok(self.with_grants(positions).await?.into_iter().next())
    }

    async fn list_positions(&self, organization_id: Uuid) -> StoreResult<Vec<PositionDetail>> {
        let sql = format!(
            "SELECT {} FROM positions WHERE organization_id = $1 ORDER BY name",
            POSITION_COLUMNS
        );
        let positions = sqlx::query_as::<_, Position>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        self.with_grants(positions).await
    }

    async fn rename_position(&self, id: Uuid, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE positions SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn grant_permissions(&self, grants: &[PermissionGrant]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        write_grants(&mut tx, grants).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn revoke_permissions(&self, position_id: Uuid, permissions: &[Permission]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for permission in permissions {
            let result = sqlx::query("DELETE FROM position_permissions WHERE position_id = $1 AND permission = $2")
                .bind(position_id)
                .bind(*permission)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }

    async fn delete_position(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM positions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
