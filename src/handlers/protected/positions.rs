use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{Ack, StaffRef};
use crate::app::AppState;
use crate::database::models::{PositionDetail, Staff};
use crate::middleware::{policy, ApiResponse, ApiResult, AuthStaff};
use crate::services::position_service::{NewPosition, PositionUpdate};

#[derive(Debug, Deserialize)]
pub struct PermissionList {
    pub permissions: Vec<String>,
}

/// POST /api/user/position
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<NewPosition>,
) -> ApiResult<PositionDetail> {
    state.authorizer.require(&caller, policy::POSITION_CREATE).await?;
    let position = state
        .services
        .positions
        .create_position(body, caller.staff_id)
        .await?;
    Ok(ApiResponse::created(position))
}

/// GET /api/user/position/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<PositionDetail> {
    state.authorizer.require(&caller, policy::POSITION_GET).await?;
    Ok(ApiResponse::success(state.services.positions.get_position(id).await?))
}

/// GET /api/user/position/org/:id
pub async fn by_organization(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<PositionDetail>> {
    state.authorizer.require(&caller, policy::POSITION_LIST).await?;
    Ok(ApiResponse::success(state.services.positions.get_positions(id).await?))
}

/// PUT /api/user/position/:id - rename and grant more permissions
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<PositionUpdate>,
) -> ApiResult<PositionDetail> {
    state.authorizer.require(&caller, policy::POSITION_UPDATE).await?;
    let position = state
        .services
        .positions
        .update_position(id, body, caller.staff_id)
        .await?;
    Ok(ApiResponse::success(position))
}

/// PUT /api/user/position/perm/:id - withdraw permissions
pub async fn remove_permissions(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<PermissionList>,
) -> ApiResult<PositionDetail> {
    state.authorizer.require(&caller, policy::POSITION_UPDATE).await?;
    let position = state
        .services
        .positions
        .remove_permissions(id, &body.permissions)
        .await?;
    Ok(ApiResponse::success(position))
}

/// DELETE /api/user/position/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, policy::POSITION_DELETE).await?;
    state.services.positions.delete_position(id).await?;
    Ok(ApiResponse::success(Ack::of(id)))
}

/// PUT /api/user/position/give/:id - put a batch of staff into the position
pub async fn give(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<Vec<StaffRef>>,
) -> ApiResult<Vec<Staff>> {
    state.authorizer.require(&caller, policy::POSITION_GIVE).await?;
    let mut updated = Vec::with_capacity(body.len());
    for staff in body {
        updated.push(state.services.positions.assign_position(staff.staff_id, id).await?);
    }
    Ok(ApiResponse::success(updated))
}

/// PUT /api/user/position/take/:id - send a batch of staff back to their fallback position
pub async fn take(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(_id): Path<Uuid>,
    Json(body): Json<Vec<StaffRef>>,
) -> ApiResult<Vec<Staff>> {
    state.authorizer.require(&caller, policy::POSITION_GIVE).await?;
    let mut updated = Vec::with_capacity(body.len());
    for staff in body {
        updated.push(state.services.positions.revoke_position(staff.staff_id).await?);
    }
    Ok(ApiResponse::success(updated))
}
