//! Startup provisioning.
//!
//! Makes sure the default organization, its fallback team and position, and
//! the built-in organization types exist before anything is served. Every
//! step looks before it writes, so running it against an already provisioned
//! store changes nothing.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::config::BootstrapConfig;
use crate::database::models::{
    Organization, OrganizationDetail, OrganizationType, PermissionGrant, Sex, Staff, Team,
    DEFAULT_MEMBERSHIP_NAME, TYPE_DEVELOPER, TYPE_NONE,
};
use crate::database::store::*;
use crate::permissions::Permission;
use crate::services::position_service::position_with;
use crate::services::ServiceResult;

/// Identifiers every service falls back to when a request leaves membership out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub organization_id: Uuid,
    pub team_id: Uuid,
    pub position_id: Uuid,
}

pub const DEFAULT_ORGANIZATION_NAME: &str = "default";
pub const DEFAULT_ORGANIZATION_URL: &str = "https://nure.ua/";

pub async fn ensure_defaults(store: &dyn Store, config: &BootstrapConfig) -> ServiceResult<Defaults> {
    let none_type = ensure_type(store, TYPE_NONE).await?;
    ensure_type(store, TYPE_DEVELOPER).await?;

    let organization = match store.find_organization_by_name(DEFAULT_ORGANIZATION_NAME).await? {
        Some(organization) => organization,
        None => {
            let organization = Organization {
                id: Uuid::new_v4(),
                name: DEFAULT_ORGANIZATION_NAME.to_string(),
                website_url: DEFAULT_ORGANIZATION_URL.to_string(),
                image: None,
                created_by: None,
                created_at: Utc::now(),
            };
            let detail = OrganizationDetail {
                organization: organization.clone(),
                types: vec![none_type],
                positions: Vec::new(),
                teams: Vec::new(),
            };
            store.insert_organization(&detail).await?;
            info!("Provisioned default organization {}", organization.id);
            organization
        }
    };

    let team_id = match store.find_team_by_name(organization.id, DEFAULT_MEMBERSHIP_NAME).await? {
        Some(team) => team.id,
        None => {
            let team = Team {
                id: Uuid::new_v4(),
                organization_id: organization.id,
                name: DEFAULT_MEMBERSHIP_NAME.to_string(),
                description: None,
                created_at: Utc::now(),
            };
            store.insert_team(&team).await?;
            team.id
        }
    };

    let position_id = match store.find_position_by_name(organization.id, DEFAULT_MEMBERSHIP_NAME).await? {
        Some(position) => {
            // Catch up with permissions added to the catalogue since the last start.
            let grants: Vec<PermissionGrant> = Permission::ALL
                .iter()
                .filter(|p| !position.has_permission(**p))
                .map(|permission| PermissionGrant {
                    position_id: position.position.id,
                    permission: *permission,
                    granted_by: None,
                })
                .collect();
            if !grants.is_empty() {
                store.grant_permissions(&grants).await?;
                info!("Granted {} new permissions to the default position", grants.len());
            }
            position.position.id
        }
        None => {
            let detail = position_with(organization.id, DEFAULT_MEMBERSHIP_NAME, Permission::ALL, None);
            store.insert_position(&detail).await?;
            detail.position.id
        }
    };

    let defaults = Defaults {
        organization_id: organization.id,
        team_id,
        position_id,
    };
    ensure_admin(store, &defaults, config).await?;
    Ok(defaults)
}

async fn ensure_type(store: &dyn Store, name: &str) -> ServiceResult<OrganizationType> {
    if let Some(existing) = store.find_organization_type_by_name(name).await? {
        return Ok(existing);
    }
    let org_type = OrganizationType {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    store.insert_organization_type(&org_type).await?;
    Ok(org_type)
}

async fn ensure_admin(store: &dyn Store, defaults: &Defaults, config: &BootstrapConfig) -> ServiceResult<()> {
    let (email, password) = match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => (email.trim().to_lowercase(), password),
        (Some(_), None) => {
            warn!("Bootstrap admin email is set without a password; skipping");
            return Ok(());
        }
        _ => return Ok(()),
    };
    if store.find_staff_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let admin = Staff {
        id: Uuid::new_v4(),
        first_name: config.admin_first_name.clone(),
        last_name: config.admin_last_name.clone(),
        email,
        password_hash: hash_password(password),
        sex: Sex::Male,
        additional_info: None,
        organization_id: defaults.organization_id,
        team_id: defaults.team_id,
        position_id: Some(defaults.position_id),
        text_color: None,
        background_color: None,
        current_image: None,
        created_at: Utc::now(),
    };
    store.insert_staff(&admin).await?;
    info!("Provisioned bootstrap admin {}", admin.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn provisioning_twice_reuses_everything() {
        let store = MemoryStore::new();
        let config = BootstrapConfig::default();
        let first = ensure_defaults(&store, &config).await.unwrap();
        let second = ensure_defaults(&store, &config).await.unwrap();
        assert_eq!(first, second);

        assert_eq!(store.list_organizations().await.unwrap().len(), 1);
        assert_eq!(store.list_organization_types().await.unwrap().len(), 2);
        let position = store.find_position(first.position_id).await.unwrap().unwrap();
        assert_eq!(position.permissions.len(), Permission::ALL.len());
    }

    #[tokio::test]
    async fn lost_grants_are_restored() {
        let store = MemoryStore::new();
        let config = BootstrapConfig::default();
        let defaults = ensure_defaults(&store, &config).await.unwrap();
        store
            .revoke_permissions(defaults.position_id, &[Permission::PrizeGive])
            .await
            .unwrap();

        ensure_defaults(&store, &config).await.unwrap();
        let position = store.find_position(defaults.position_id).await.unwrap().unwrap();
        assert!(position.has_permission(Permission::PrizeGive));
    }

    #[tokio::test]
    async fn the_admin_is_created_once() {
        let store = MemoryStore::new();
        let config = BootstrapConfig {
            admin_email: Some("Admin@Example.com".into()),
            admin_password: Some("changeme".into()),
            ..Default::default()
        };
        ensure_defaults(&store, &config).await.unwrap();
        ensure_defaults(&store, &config).await.unwrap();

        let admin = store.find_staff_by_email("admin@example.com").await.unwrap().unwrap();
        assert_ne!(admin.password_hash, "changeme");
        let defaults = ensure_defaults(&store, &config).await.unwrap();
        assert_eq!(store.list_staff_by_organization(defaults.organization_id).await.unwrap().len(), 1);
    }
}
