use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::Ack;
use crate::app::AppState;
use crate::database::models::{Organization, OrganizationDetail, OrganizationType, Staff};
use crate::middleware::{policy, ApiResponse, ApiResult, AuthStaff};
use crate::services::organization_service::{MemberAssignment, NewOrganization, OrganizationPatch};

#[derive(Debug, Deserialize)]
pub struct TypeRequest {
    pub name: String,
}

/// GET /api/org
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
) -> ApiResult<Vec<Organization>> {
    state.authorizer.require(&caller, policy::ORGANIZATION_LIST).await?;
    Ok(ApiResponse::success(state.services.organizations.get_organizations().await?))
}

/// POST /api/org - create an organization with its positions and teams
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<NewOrganization>,
) -> ApiResult<OrganizationDetail> {
    state.authorizer.require(&caller, policy::ORGANIZATION_CREATE).await?;
    let organization = state
        .services
        .organizations
        .create_organization(body, Some(caller.staff_id))
        .await?;
    Ok(ApiResponse::created(organization))
}

/// GET /api/org/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrganizationDetail> {
    state.authorizer.require(&caller, policy::ORGANIZATION_GET).await?;
    Ok(ApiResponse::success(state.services.organizations.get_organization(id).await?))
}

/// PUT /api/org/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<OrganizationPatch>,
) -> ApiResult<Organization> {
    state.authorizer.require(&caller, policy::ORGANIZATION_UPDATE).await?;
    Ok(ApiResponse::success(
        state.services.organizations.update_organization(id, body).await?,
    ))
}

/// DELETE /api/org/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, policy::ORGANIZATION_DELETE).await?;
    state.services.organizations.delete_organization(id).await?;
    Ok(ApiResponse::success(Ack::of(id)))
}

/// GET /api/org/staff/:id
pub async fn staff(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Staff>> {
    state.authorizer.require(&caller, policy::STAFF_BY_ORGANIZATION).await?;
    Ok(ApiResponse::success(
        state.services.staff.get_staff_by_organization(id).await?,
    ))
}

/// PUT /api/org/staff/:id - move staff into the organization
pub async fn add_staff(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<Vec<MemberAssignment>>,
) -> ApiResult<Vec<Staff>> {
    state.authorizer.require(&caller, policy::ORGANIZATION_ADD_STAFF).await?;
    Ok(ApiResponse::success(state.services.organizations.add_staff(id, body).await?))
}

/// GET /api/org/type
pub async fn types(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
) -> ApiResult<Vec<OrganizationType>> {
    state.authorizer.require(&caller, policy::ORGANIZATION_TYPE_LIST).await?;
    Ok(ApiResponse::success(state.services.organizations.get_types().await?))
}

/// POST /api/org/type
pub async fn create_type(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<TypeRequest>,
) -> ApiResult<OrganizationType> {
    state.authorizer.require(&caller, policy::ORGANIZATION_TYPE_CREATE).await?;
    Ok(ApiResponse::created(
        state.services.organizations.create_type(&body.name).await?,
    ))
}

/// GET /api/org/type/:id
pub async fn get_type(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrganizationType> {
    state.authorizer.require(&caller, policy::ORGANIZATION_TYPE_GET).await?;
    Ok(ApiResponse::success(state.services.organizations.get_type(id).await?))
}

/// PUT /api/org/type/:id
pub async fn update_type(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<TypeRequest>,
) -> ApiResult<OrganizationType> {
    state.authorizer.require(&caller, policy::ORGANIZATION_TYPE_UPDATE).await?;
    Ok(ApiResponse::success(
        state.services.organizations.update_type(id, &body.name).await?,
    ))
}

/// DELETE /api/org/type/:id
pub async fn delete_type(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, policy::ORGANIZATION_TYPE_DELETE).await?;
    state.services.organizations.delete_type(id).await?;
    Ok(ApiResponse::success(Ack::of(id)))
}
