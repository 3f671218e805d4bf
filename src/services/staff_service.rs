use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::bootstrap::Defaults;
use crate::database::models::{Sex, Staff, StaffImage, DEFAULT_MEMBERSHIP_NAME};
use crate::database::store::*;
use crate::database::DatabaseError;
use crate::permissions::StaffWithPosition;
use crate::services::error::{parse_label, ServiceError, ServiceResult};
use crate::services::validation::{require_text, validate_email, validate_hex_color};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStaff {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub sex: String,
    pub additional_info: Option<String>,
    pub organization_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub sex: Option<String>,
    pub additional_info: Option<String>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
}

/// What a staff member sees about themselves.
#[derive(Debug, Clone, Serialize)]
pub struct StaffProfile {
    #[serde(flatten)]
    pub staff: StaffWithPosition,
    pub images: Vec<StaffImage>,
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_colors(text: Option<&str>, background: Option<&str>) -> ServiceResult<()> {
    if let Some(color) = text {
        validate_hex_color("text_color", color)?;
    }
    if let Some(color) = background {
        validate_hex_color("background_color", color)?;
    }
    Ok(())
}

/// The team and position a member of `organization_id` falls back to.
pub(crate) async fn fallback_membership(
    store: &dyn Store,
    defaults: &Defaults,
    organization_id: Uuid,
) -> ServiceResult<(Option<Uuid>, Option<Uuid>)> {
    if organization_id == defaults.organization_id {
        return Ok((Some(defaults.team_id), Some(defaults.position_id)));
    }
    let team = store.find_team_by_name(organization_id, DEFAULT_MEMBERSHIP_NAME).await?;
    let position = store
        .find_position_by_name(organization_id, DEFAULT_MEMBERSHIP_NAME)
        .await?;
    Ok((team.map(|t| t.id), position.map(|p| p.position.id)))
}

/// Staff directory: accounts, profiles and images.
#[derive(Clone)]
pub struct StaffService {
    store: Arc<dyn Store>,
    defaults: Defaults,
}

impl StaffService {
    pub fn new(store: Arc<dyn Store>, defaults: Defaults) -> Self {
        Self { store, defaults }
    }

    /// Registers a staff member. Missing memberships fall back to the
    /// organization's defaults.
    pub async fn create_staff(&self, new: NewStaff) -> ServiceResult<Staff> {
        require_text("first_name", &new.first_name)?;
        require_text("last_name", &new.last_name)?;
        require_text("password", &new.password)?;
        let email = normalize_email(&new.email);
        validate_email(&email)?;
        let sex: Sex = parse_label("sex", &new.sex)?;
        check_colors(new.text_color.as_deref(), new.background_color.as_deref())?;

        let organization_id = new.organization_id.unwrap_or(self.defaults.organization_id);
        if self.store.find_organization(organization_id).await?.is_none() {
            return Err(ServiceError::not_found("organization", organization_id));
        }
        let (fallback_team, fallback_position) =
            fallback_membership(self.store.as_ref(), &self.defaults, organization_id).await?;

        let team_id = match new.team_id.or(fallback_team) {
            Some(team_id) => team_id,
            None => {
                return Err(ServiceError::validation(
                    "team_id",
                    format!("organization {} has no default team", organization_id),
                ))
            }
        };
        match self.store.find_team(team_id).await? {
            Some(team) if team.organization_id == organization_id => {}
            Some(_) => return Err(ServiceError::validation("team_id", "team belongs to another organization")),
            None => return Err(ServiceError::not_found("team", team_id)),
        }

        let position_id = new.position_id.or(fallback_position);
        if let Some(position_id) = position_id {
            match self.store.find_position(position_id).await? {
                Some(p) if p.position.organization_id == organization_id => {}
                Some(_) => {
                    return Err(ServiceError::validation(
                        "position_id",
                        "position belongs to another organization",
                    ))
                }
                None => return Err(ServiceError::not_found("position", position_id)),
            }
        }

        if self.store.find_staff_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(format!("email {} is already registered", email)));
        }

        let staff = Staff {
            id: Uuid::new_v4(),
            first_name: new.first_name,
            last_name: new.last_name,
            email,
            password_hash: hash_password(&new.password),
            sex,
            additional_info: new.additional_info,
            organization_id,
            team_id,
            position_id,
            text_color: new.text_color,
            background_color: new.background_color,
            current_image: None,
            created_at: Utc::now(),
        };
        self.store.insert_staff(&staff).await.map_err(email_conflict)?;
        info!("Registered staff {} in organization {}", staff.id, organization_id);
        Ok(staff)
    }

    /// Checks credentials; `None` when the email is unknown or the password is wrong.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Option<Staff>> {
        let staff = self.store.find_staff_by_email(&normalize_email(email)).await?;
        Ok(staff.filter(|s| verify_password(password, &s.password_hash)))
    }

    pub async fn get_staff(&self, id: Uuid) -> ServiceResult<Staff> {
        self.store
            .find_staff(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("staff", id))
    }

    /// Loads a staff member with the position their permissions come from.
    pub async fn get_staff_with_position(&self, id: Uuid) -> ServiceResult<StaffWithPosition> {
        let staff = self.get_staff(id).await?;
        let position = match staff.position_id {
            Some(position_id) => self.store.find_position(position_id).await?,
            None => None,
        };
        Ok(StaffWithPosition { staff, position })
    }

    pub async fn get_profile(&self, id: Uuid) -> ServiceResult<StaffProfile> {
        let staff = self.get_staff_with_position(id).await?;
        let images = self.store.list_staff_images(id).await?;
        Ok(StaffProfile { staff, images })
    }

    pub async fn update_staff(&self, id: Uuid, patch: StaffPatch) -> ServiceResult<Staff> {
        let mut staff = self.get_staff(id).await?;

        if let Some(first_name) = patch.first_name.filter(|v| !v.trim().is_empty()) {
            staff.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name.filter(|v| !v.trim().is_empty()) {
            staff.last_name = last_name;
        }
        if let Some(email) = patch.email.filter(|v| !v.trim().is_empty()) {
            let email = normalize_email(&email);
            validate_email(&email)?;
            staff.email = email;
        }
        if let Some(password) = patch.password.filter(|v| !v.is_empty()) {
            staff.password_hash = hash_password(&password);
        }
        if let Some(raw) = patch.sex.as_deref() {
            staff.sex = parse_label("sex", raw)?;
        }
        if let Some(info) = patch.additional_info {
            staff.additional_info = Some(info);
        }
        check_colors(patch.text_color.as_deref(), patch.background_color.as_deref())?;
        if let Some(color) = patch.text_color {
            staff.text_color = Some(color);
        }
        if let Some(color) = patch.background_color {
            staff.background_color = Some(color);
        }

        if !self.store.update_staff(&staff).await.map_err(email_conflict)? {
            return Err(ServiceError::not_found("staff", id));
        }
        Ok(staff)
    }

    pub async fn delete_staff(&self, id: Uuid) -> ServiceResult<()> {
        if !self.store.delete_staff(id).await? {
            return Err(ServiceError::not_found("staff", id));
        }
        info!("Deleted staff {}", id);
        Ok(())
    }

    pub async fn get_staff_by_event(&self, event_id: Uuid) -> ServiceResult<Vec<Staff>> {
        Ok(self.store.list_staff_by_event(event_id).await?)
    }

    pub async fn get_staff_by_step(&self, step_id: Uuid) -> ServiceResult<Vec<Staff>> {
        Ok(self.store.list_staff_by_step(step_id).await?)
    }

    pub async fn get_staff_by_organization(&self, organization_id: Uuid) -> ServiceResult<Vec<Staff>> {
        if self.store.find_organization(organization_id).await?.is_none() {
            return Err(ServiceError::not_found("organization", organization_id));
        }
        Ok(self.store.list_staff_by_organization(organization_id).await?)
    }

    /// Records a new profile image and makes it the current one.
    pub async fn attach_image(&self, staff_id: Uuid, path: &str) -> ServiceResult<StaffImage> {
        require_text("path", path)?;
        let mut staff = self.get_staff(staff_id).await?;
        let image = StaffImage {
            id: Uuid::new_v4(),
            staff_id,
            path: path.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_staff_image(&image).await?;
        staff.current_image = Some(image.path.clone());
        self.store.update_staff(&staff).await?;
        debug!("Staff {} switched image to {}", staff_id, image.path);
        Ok(image)
    }
}

fn email_conflict(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::Conflict(constraint) if constraint.contains("email") => {
            ServiceError::Conflict("email is already registered".to_string())
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permission;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn sign_ups_land_in_the_default_organization() {
        let ctx = TestContext::new().await;
        let staff = ctx.staff("newcomer").await;

        assert_eq!(staff.organization_id, ctx.defaults.organization_id);
        assert_eq!(staff.team_id, ctx.defaults.team_id);
        assert_eq!(staff.position_id, Some(ctx.defaults.position_id));
        assert_ne!(staff.password_hash, "secret-password");

        let with_position = ctx.services.staff.get_staff_with_position(staff.id).await.unwrap();
        assert!(with_position.has_permission(Permission::EventCreate));
    }

    #[tokio::test]
    async fn emails_are_unique_regardless_of_case() {
        let ctx = TestContext::new().await;
        let mut new = TestContext::new_staff("twin");
        new.email = "Twin@Example.com".into();
        ctx.services.staff.create_staff(new.clone()).await.unwrap();

        new.email = "twin@example.com".into();
        let err = ctx.services.staff.create_staff(new).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn registration_validates_fields() {
        let ctx = TestContext::new().await;

        let mut bad_color = TestContext::new_staff("painter");
        bad_color.text_color = Some("red".into());
        let err = ctx.services.staff.create_staff(bad_color).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "text_color", .. }));

        let mut bad_sex = TestContext::new_staff("unknown");
        bad_sex.sex = "robot".into();
        let err = ctx.services.staff.create_staff(bad_sex).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "sex", .. }));

        let mut bad_email = TestContext::new_staff("mailer");
        bad_email.email = "not-an-email".into();
        let err = ctx.services.staff.create_staff(bad_email).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "email", .. }));
    }

    #[tokio::test]
    async fn authentication_checks_the_password() {
        let ctx = TestContext::new().await;
        let new = TestContext::new_staff("login");
        let staff = ctx.services.staff.create_staff(new.clone()).await.unwrap();

        let found = ctx
            .services
            .staff
            .authenticate(&new.email.to_uppercase(), &new.password)
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.id), Some(staff.id));
        assert!(ctx
            .services
            .staff
            .authenticate(&new.email, "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(ctx
            .services
            .staff
            .authenticate("nobody@example.com", &new.password)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn updates_are_partial_and_rehash_passwords() {
        let ctx = TestContext::new().await;
        let new = TestContext::new_staff("patchy");
        let staff = ctx.services.staff.create_staff(new.clone()).await.unwrap();

        let updated = ctx
            .services
            .staff
            .update_staff(
                staff.id,
                StaffPatch {
                    last_name: Some("Renamed".into()),
                    password: Some("another-password".into()),
                    background_color: Some("#000000".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, staff.first_name);
        assert_eq!(updated.last_name, "Renamed");
        assert!(ctx
            .services
            .staff
            .authenticate(&new.email, "another-password")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn attaching_an_image_makes_it_current() {
        let ctx = TestContext::new().await;
        let staff = ctx.staff("selfie").await;
        ctx.services
            .staff
            .attach_image(staff.id, "https://cdn.example.com/me.png")
            .await
            .unwrap();

        let profile = ctx.services.staff.get_profile(staff.id).await.unwrap();
        assert_eq!(profile.images.len(), 1);
        assert_eq!(
            profile.staff.staff.current_image.as_deref(),
            Some("https://cdn.example.com/me.png")
        );
    }

    #[tokio::test]
    async fn deleting_removes_the_account() {
        let ctx = TestContext::new().await;
        let staff = ctx.staff("leaver").await;
        ctx.services.staff.delete_staff(staff.id).await.unwrap();
        assert!(matches!(
            ctx.services.staff.get_staff(staff.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
