use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::Ack;
use crate::app::AppState;
use crate::database::models::{AwardedPrize, Staff, StaffImage};
use crate::middleware::{policy, ApiResponse, ApiResult, AuthStaff};
use crate::permissions::StaffWithPosition;
use crate::services::staff_service::{NewStaff, StaffPatch, StaffProfile};

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub path: String,
}

/// POST /api/user - register a staff member on someone else's behalf
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<NewStaff>,
) -> ApiResult<Staff> {
    state.authorizer.require(&caller, policy::STAFF_CREATE).await?;
    Ok(ApiResponse::created(state.services.staff.create_staff(body).await?))
}

/// GET /api/user/me
pub async fn me(State(state): State<AppState>, Extension(caller): Extension<AuthStaff>) -> ApiResult<StaffProfile> {
    state.authorizer.require(&caller, &[]).await?;
    Ok(ApiResponse::success(state.services.staff.get_profile(caller.staff_id).await?))
}

/// PUT /api/user/image - record a new profile image for the caller
pub async fn image(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<ImageRequest>,
) -> ApiResult<StaffImage> {
    state.authorizer.require(&caller, &[]).await?;
    let image = state.services.staff.attach_image(caller.staff_id, &body.path).await?;
    Ok(ApiResponse::created(image))
}

/// GET /api/user/prizes/:id
pub async fn prizes(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<AwardedPrize>> {
    state
        .authorizer
        .require_on(&caller, id, policy::STAFF_GET_SELF, policy::STAFF_PRIZES_OTHER)
        .await?;
    Ok(ApiResponse::success(state.services.prizes.get_staff_prizes(id).await?))
}

/// GET /api/user/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<StaffWithPosition> {
    state
        .authorizer
        .require_on(&caller, id, policy::STAFF_GET_SELF, policy::STAFF_GET_OTHER)
        .await?;
    Ok(ApiResponse::success(
        state.services.staff.get_staff_with_position(id).await?,
    ))
}

/// PUT /api/user/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<StaffPatch>,
) -> ApiResult<Staff> {
    state
        .authorizer
        .require_on(&caller, id, policy::STAFF_UPDATE_SELF, policy::STAFF_UPDATE_OTHER)
        .await?;
    Ok(ApiResponse::success(state.services.staff.update_staff(id, body).await?))
}

/// DELETE /api/user/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ack> {
    state
        .authorizer
        .require_on(&caller, id, policy::STAFF_DELETE_SELF, policy::STAFF_DELETE_OTHER)
        .await?;
    state.services.staff.delete_staff(id).await?;
    Ok(ApiResponse::success(Ack::of(id)))
}

/// GET /api/user/event/:id - the roster of an event
pub async fn by_event(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Staff>> {
    state.authorizer.require(&caller, &[]).await?;
    Ok(ApiResponse::success(state.services.staff.get_staff_by_event(id).await?))
}

/// GET /api/user/step/:id - staff assigned to a step
pub async fn by_step(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Staff>> {
    state.authorizer.require(&caller, &[]).await?;
    Ok(ApiResponse::success(state.services.staff.get_staff_by_step(id).await?))
}
