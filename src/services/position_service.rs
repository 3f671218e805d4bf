use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::bootstrap::Defaults;
use crate::database::models::{Membership, PermissionGrant, Position, PositionDetail, Staff};
use crate::database::store::*;
use crate::database::DatabaseError;
use crate::permissions::Permission;
use crate::services::error::{parse_label, ServiceError, ServiceResult};
use crate::services::staff_service::fallback_membership;
use crate::services::validation::require_text;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPosition {
    pub organization_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionUpdate {
    pub name: Option<String>,
    /// Granted in addition to what the position already holds.
    #[serde(default)]
    pub permissions: Vec<String>,
}

pub(crate) fn parse_permissions(raw: &[String]) -> ServiceResult<Vec<Permission>> {
    raw.iter().map(|label| parse_label("permissions", label)).collect()
}

/// A fresh position carrying `permissions`.
pub(crate) fn position_with(
    organization_id: Uuid,
    name: &str,
    permissions: &[Permission],
    granted_by: Option<Uuid>,
) -> PositionDetail {
    let position = Position {
        id: Uuid::new_v4(),
        organization_id,
        name: name.to_string(),
        created_at: Utc::now(),
    };
    let permissions = permissions
        .iter()
        .map(|permission| PermissionGrant {
            position_id: position.id,
            permission: *permission,
            granted_by,
        })
        .collect();
    PositionDetail { position, permissions }
}

fn position_conflict(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::Conflict(_) => {
            ServiceError::Conflict("the organization already has a position with that name".to_string())
        }
        other => other.into(),
    }
}

/// Positions and the permissions they grant.
#[derive(Clone)]
pub struct PositionService {
    store: Arc<dyn Store>,
    defaults: Defaults,
}

impl PositionService {
    pub fn new(store: Arc<dyn Store>, defaults: Defaults) -> Self {
        Self { store, defaults }
    }

    pub async fn create_position(&self, new: NewPosition, actor: Uuid) -> ServiceResult<PositionDetail> {
        require_text("name", &new.name)?;
        let permissions = parse_permissions(&new.permissions)?;
        let organization_id = new.organization_id.unwrap_or(self.defaults.organization_id);
        if self.store.find_organization(organization_id).await?.is_none() {
            return Err(ServiceError::not_found("organization", organization_id));
        }

        let detail = position_with(organization_id, new.name.trim(), &permissions, Some(actor));
        self.store.insert_position(&detail).await.map_err(position_conflict)?;
        self.get_position(detail.position.id).await
    }

    pub async fn get_position(&self, id: Uuid) -> ServiceResult<PositionDetail> {
        self.store
            .find_position(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("position", id))
    }

    pub async fn get_positions(&self, organization_id: Uuid) -> ServiceResult<Vec<PositionDetail>> {
        Ok(self.store.list_positions(organization_id).await?)
    }

    /// Renames and grants additional permissions. Existing grants are never dropped here.
    pub async fn update_position(&self, id: Uuid, update: PositionUpdate, actor: Uuid) -> ServiceResult<PositionDetail> {
        let permissions = parse_permissions(&update.permissions)?;
        self.get_position(id).await?;

        if let Some(name) = update.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            self.store.rename_position(id, name).await.map_err(position_conflict)?;
        }
        let grants: Vec<PermissionGrant> = permissions
            .into_iter()
            .map(|permission| PermissionGrant {
                position_id: id,
                permission,
                granted_by: Some(actor),
            })
            .collect();
        if !grants.is_empty() {
            self.store.grant_permissions(&grants).await?;
        }
        self.get_position(id).await
    }

    /// Drops every listed permission from the position.
    pub async fn remove_permissions(&self, id: Uuid, permissions: &[String]) -> ServiceResult<PositionDetail> {
        let permissions = parse_permissions(permissions)?;
        self.get_position(id).await?;
        let removed = self.store.revoke_permissions(id, &permissions).await?;
        info!("Revoked {} permissions from position {}", removed, id);
        self.get_position(id).await
    }

    pub async fn delete_position(&self, id: Uuid) -> ServiceResult<()> {
        if !self.store.delete_position(id).await? {
            return Err(ServiceError::not_found("position", id));
        }
        Ok(())
    }

    /// Puts a staff member into a position of their own organization.
    pub async fn assign_position(&self, staff_id: Uuid, position_id: Uuid) -> ServiceResult<Staff> {
        let staff = self.load_staff(staff_id).await?;
        let position = self.get_position(position_id).await?;
        if position.position.organization_id != staff.organization_id {
            return Err(ServiceError::validation(
                "position_id",
                format!(
                    "position {} is not part of organization {}",
                    position_id, staff.organization_id
                ),
            ));
        }
        self.move_staff(staff, Some(position_id)).await
    }

    /// Returns a staff member to their organization's fallback position.
    pub async fn revoke_position(&self, staff_id: Uuid) -> ServiceResult<Staff> {
        let staff = self.load_staff(staff_id).await?;
        let (_, fallback) = fallback_membership(self.store.as_ref(), &self.defaults, staff.organization_id).await?;
        self.move_staff(staff, fallback).await
    }

    async fn move_staff(&self, mut staff: Staff, position_id: Option<Uuid>) -> ServiceResult<Staff> {
        self.store
            .apply_memberships(&[Membership {
                staff_id: staff.id,
                organization_id: staff.organization_id,
                team_id: staff.team_id,
                position_id,
            }])
            .await?;
        staff.position_id = position_id;
        info!("Moved staff {} to position {:?}", staff.id, position_id);
        Ok(staff)
    }

    async fn load_staff(&self, id: Uuid) -> ServiceResult<Staff> {
        self.store
            .find_staff(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("staff", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn labels(permissions: &[Permission]) -> Vec<String> {
        permissions.iter().map(|p| p.as_str().to_string()).collect()
    }

    #[tokio::test]
    async fn positions_are_created_with_their_grants() {
        let ctx = TestContext::new().await;
        let actor = ctx.staff("hr").await;
        let position = ctx
            .services
            .positions
            .create_position(
                NewPosition {
                    organization_id: None,
                    name: "reviewer".into(),
                    permissions: labels(&[Permission::StepUpdate, Permission::StepGetAll]),
                },
                actor.id,
            )
            .await
            .unwrap();

        assert_eq!(position.position.organization_id, ctx.defaults.organization_id);
        assert!(position.has_permission(Permission::StepUpdate));
        assert!(!position.has_permission(Permission::StepDelete));
        assert!(position.permissions.iter().all(|g| g.granted_by == Some(actor.id)));

        let err = ctx
            .services
            .positions
            .create_position(
                NewPosition {
                    organization_id: None,
                    name: "reviewer".into(),
                    permissions: vec![],
                },
                actor.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn updates_only_add_and_removal_is_explicit() {
        let ctx = TestContext::new().await;
        let actor = ctx.staff("hr").await;
        let positions = &ctx.services.positions;
        let position = positions
            .create_position(
                NewPosition {
                    organization_id: None,
                    name: "editor".into(),
                    permissions: labels(&[Permission::EventUpdate]),
                },
                actor.id,
            )
            .await
            .unwrap();

        let updated = positions
            .update_position(
                position.position.id,
                PositionUpdate {
                    name: Some("senior editor".into()),
                    permissions: labels(&[Permission::EventUpdate, Permission::EventDelete]),
                },
                actor.id,
            )
            .await
            .unwrap();
        assert_eq!(updated.position.name, "senior editor");
        assert_eq!(updated.permissions.len(), 2);

        let trimmed = positions
            .remove_permissions(
                position.position.id,
                &labels(&[Permission::EventUpdate, Permission::EventDelete]),
            )
            .await
            .unwrap();
        assert!(trimmed.permissions.is_empty());

        let err = positions
            .remove_permissions(position.position.id, &["fly".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn positions_only_go_to_members_of_their_organization() {
        let ctx = TestContext::new().await;
        let org = ctx.organization("Umbrella").await;
        let outsider = ctx.staff("outsider").await;
        let foreign = org.positions[0].position.id;

        let err = ctx
            .services
            .positions
            .assign_position(outsider.id, foreign)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "position_id", .. }));
    }

    #[tokio::test]
    async fn revoking_falls_back_to_the_default_position() {
        let ctx = TestContext::new().await;
        let actor = ctx.staff("hr").await;
        let staff = ctx.staff("promoted").await;
        let positions = &ctx.services.positions;
        let lead = positions
            .create_position(
                NewPosition {
                    organization_id: None,
                    name: "lead".into(),
                    permissions: vec![],
                },
                actor.id,
            )
            .await
            .unwrap();

        let moved = positions.assign_position(staff.id, lead.position.id).await.unwrap();
        assert_eq!(moved.position_id, Some(lead.position.id));

        let reverted = positions.revoke_position(staff.id).await.unwrap();
        assert_eq!(reverted.position_id, Some(ctx.defaults.position_id));
        let stored = ctx.services.staff.get_staff(staff.id).await.unwrap();
        assert_eq!(stored.position_id, Some(ctx.defaults.position_id));
    }

    #[tokio::test]
    async fn deleting_a_position_strips_its_holders() {
        let ctx = TestContext::new().await;
        let actor = ctx.staff("hr").await;
        let staff = ctx.staff("holder").await;
        let positions = &ctx.services.positions;
        let temp = positions
            .create_position(
                NewPosition {
                    organization_id: None,
                    name: "temp".into(),
                    permissions: labels(&[Permission::EventCreate]),
                },
                actor.id,
            )
            .await
            .unwrap();
        positions.assign_position(staff.id, temp.position.id).await.unwrap();

        positions.delete_position(temp.position.id).await.unwrap();

        let holder = ctx.services.staff.get_staff_with_position(staff.id).await.unwrap();
        assert_eq!(holder.staff.position_id, None);
        assert!(!holder.has_permission(Permission::EventCreate));
    }
}
