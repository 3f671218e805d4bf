use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{Ack, StaffRef};
use crate::app::AppState;
use crate::database::models::{Prize, Step, StepBundle, StepDetail, StepStaff};
use crate::middleware::{policy, ApiResponse, ApiResult, AuthStaff};
use crate::services::step_service::{NewStep, PassOutcome, StepPatch};

#[derive(Debug, Deserialize)]
pub struct CreateStepRequest {
    pub event_id: Uuid,
    #[serde(flatten)]
    pub step: NewStep,
}

#[derive(Debug, Deserialize)]
pub struct PassRequest {
    pub staff_id: Uuid,
    #[serde(alias = "step_status")]
    pub accomplishment: String,
    #[serde(default)]
    pub score: i32,
}

/// POST /api/event/step - append a step to an event
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<CreateStepRequest>,
) -> ApiResult<StepBundle> {
    state.authorizer.require(&caller, policy::STEP_CREATE).await?;
    let bundle = state
        .services
        .steps
        .create_step(body.event_id, body.step, caller.staff_id)
        .await?;
    Ok(ApiResponse::created(bundle))
}

/// GET /api/event/step/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<StepDetail> {
    state.authorizer.require(&caller, policy::STEP_GET).await?;
    Ok(ApiResponse::success(state.services.steps.get_step(id).await?))
}

/// PUT /api/event/step/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<StepPatch>,
) -> ApiResult<Step> {
    state.authorizer.require(&caller, policy::STEP_UPDATE).await?;
    Ok(ApiResponse::success(state.services.steps.update_step(id, body).await?))
}

/// DELETE /api/event/step/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, policy::STEP_DELETE).await?;
    state.services.steps.delete_step(id).await?;
    Ok(ApiResponse::success(Ack::of(id)))
}

/// GET /api/event/step/steps/:id - the steps of an event, by level
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Vec<Step>> {
    state.authorizer.require(&caller, policy::STEP_READ).await?;
    Ok(ApiResponse::success(state.services.steps.get_steps(event_id).await?))
}

/// GET /api/event/step/prizes/:id
pub async fn prizes(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Prize>> {
    state.authorizer.require(&caller, policy::STEP_READ).await?;
    Ok(ApiResponse::success(state.services.steps.get_step_prizes(id).await?))
}

/// PUT /api/event/step/status/:id - grade a staff member on a step
pub async fn pass(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<PassRequest>,
) -> ApiResult<PassOutcome> {
    state.authorizer.require(&caller, policy::STEP_PROGRESS).await?;
    let outcome = state
        .services
        .steps
        .pass_staff(id, body.staff_id, &body.accomplishment, body.score)
        .await?;
    Ok(ApiResponse::success(outcome))
}

/// PUT /api/event/step/assign/:id - put a batch of staff onto a step
pub async fn assign(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<Vec<StaffRef>>,
) -> ApiResult<Vec<StepStaff>> {
    state.authorizer.require(&caller, policy::STEP_PROGRESS).await?;
    let mut rows = Vec::with_capacity(body.len());
    for staff in body {
        rows.push(state.services.steps.assign_staff(staff.staff_id, id).await?);
    }
    Ok(ApiResponse::success(rows))
}

/// PUT /api/event/step/cancel/:id
pub async fn cancel(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Step> {
    state.authorizer.require(&caller, policy::STEP_UPDATE).await?;
    Ok(ApiResponse::success(state.services.steps.cancel_step(id).await?))
}
