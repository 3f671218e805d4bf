use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{Ack, StaffRef};
use crate::app::AppState;
use crate::database::models::{AwardedPrize, Prize};
use crate::middleware::{policy, ApiResponse, ApiResult, AuthStaff};
use crate::services::prize_service::{NewPrize, PrizePatch};

#[derive(Debug, Deserialize)]
pub struct CreatePrizeRequest {
    pub step_id: Uuid,
    #[serde(flatten)]
    pub prize: NewPrize,
}

/// POST /api/prize
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<CreatePrizeRequest>,
) -> ApiResult<Prize> {
    state.authorizer.require(&caller, policy::PRIZE_CREATE).await?;
    let prize = state
        .services
        .prizes
        .create_prize(body.step_id, body.prize, caller.staff_id)
        .await?;
    Ok(ApiResponse::created(prize))
}

/// GET /api/prize - prizes the caller created
pub async fn own(State(state): State<AppState>, Extension(caller): Extension<AuthStaff>) -> ApiResult<Vec<Prize>> {
    state.authorizer.require(&caller, policy::PRIZE_LIST).await?;
    Ok(ApiResponse::success(
        state.services.prizes.get_prizes_by_creator(caller.staff_id).await?,
    ))
}

/// GET /api/prize/all
pub async fn all(State(state): State<AppState>, Extension(caller): Extension<AuthStaff>) -> ApiResult<Vec<Prize>> {
    state.authorizer.require(&caller, policy::PRIZE_LIST).await?;
    Ok(ApiResponse::success(state.services.prizes.get_prizes().await?))
}

/// GET /api/prize/type/:type
pub async fn by_type(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(prize_type): Path<String>,
) -> ApiResult<Vec<Prize>> {
    state.authorizer.require(&caller, policy::PRIZE_GET).await?;
    Ok(ApiResponse::success(
        state.services.prizes.get_prizes_by_type(&prize_type).await?,
    ))
}

/// GET /api/prize/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Prize> {
    state.authorizer.require(&caller, policy::PRIZE_GET).await?;
    Ok(ApiResponse::success(state.services.prizes.get_prize(id).await?))
}

/// PUT /api/prize/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<PrizePatch>,
) -> ApiResult<Prize> {
    state.authorizer.require(&caller, policy::PRIZE_UPDATE).await?;
    Ok(ApiResponse::success(state.services.prizes.update_prize(id, body).await?))
}

/// DELETE /api/prize/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, policy::PRIZE_DELETE).await?;
    state.services.prizes.delete_prize(id).await?;
    Ok(ApiResponse::success(Ack::of(id)))
}

/// POST /api/prize/give/:id - award one unit of a prize
pub async fn give(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<StaffRef>,
) -> ApiResult<AwardedPrize> {
    state.authorizer.require(&caller, policy::PRIZE_GIVE).await?;
    let award = state.services.prizes.give_prize(body.staff_id, id).await?;
    Ok(ApiResponse::created(award))
}
