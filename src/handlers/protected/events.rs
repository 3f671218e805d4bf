use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{Ack, StaffRef};
use crate::app::AppState;
use crate::database::models::{Event, EventDetail, Invitation, StaffEvent, StaffScore};
use crate::middleware::{policy, ApiResponse, ApiResult, AuthStaff};
use crate::services::event_service::{EventPatch, InviteRequest, NewEvent};

#[derive(Debug, Deserialize)]
pub struct InvitationAnswer {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    /// Defaults to the caller.
    pub staff_id: Option<Uuid>,
}

/// POST /api/event - create an event, optionally with its steps
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<NewEvent>,
) -> ApiResult<EventDetail> {
    state.authorizer.require(&caller, policy::EVENT_CREATE).await?;
    let event = state.services.events.create_event(body, caller.staff_id).await?;
    Ok(ApiResponse::created(event))
}

/// GET /api/event/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<EventDetail> {
    state.authorizer.require(&caller, policy::EVENT_GET).await?;
    Ok(ApiResponse::success(state.services.events.get_event(id).await?))
}

/// PUT /api/event/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<EventPatch>,
) -> ApiResult<Event> {
    state.authorizer.require(&caller, policy::EVENT_UPDATE).await?;
    Ok(ApiResponse::success(state.services.events.update_event(id, body).await?))
}

/// DELETE /api/event/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, policy::EVENT_DELETE).await?;
    state.services.events.delete_event(id).await?;
    Ok(ApiResponse::success(Ack::of(id)))
}

/// POST /api/event/invite/:id - invite a batch of staff members
pub async fn invite(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<Vec<InviteRequest>>,
) -> ApiResult<Vec<StaffEvent>> {
    state.authorizer.require(&caller, policy::EVENT_INVITE).await?;
    let rows = state.services.events.assign_staff(id, body).await?;
    Ok(ApiResponse::created(rows))
}

/// POST /api/event/invitation/:id - accept or decline the caller's invitation
pub async fn answer_invitation(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<InvitationAnswer>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, &[]).await?;
    state
        .services
        .events
        .answer_invitation(caller.staff_id, id, &body.status)
        .await?;
    Ok(ApiResponse::success(Ack::of(id)))
}

/// GET /api/event/invitation - the caller's pending invitations
pub async fn invitations(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
) -> ApiResult<Vec<Invitation>> {
    state.authorizer.require(&caller, policy::STAFF_INVITES).await?;
    Ok(ApiResponse::success(
        state.services.events.get_invitations(caller.staff_id).await?,
    ))
}

/// GET /api/event/staff/:role - events the caller takes part in with `role`
pub async fn own_events(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(role): Path<String>,
) -> ApiResult<Vec<Event>> {
    state.authorizer.require(&caller, policy::EVENT_LIST_OWN).await?;
    Ok(ApiResponse::success(
        state.services.events.get_staffs_events(caller.staff_id, &role).await?,
    ))
}

/// GET /api/event/team/:id
pub async fn by_team(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Event>> {
    state.authorizer.require(&caller, policy::EVENT_BY_TEAM).await?;
    Ok(ApiResponse::success(state.services.events.get_events_by_team(id).await?))
}

/// GET /api/event/org/:id
pub async fn by_organization(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Event>> {
    state.authorizer.require(&caller, policy::EVENT_BY_ORGANIZATION).await?;
    Ok(ApiResponse::success(
        state.services.events.get_events_by_organization(id).await?,
    ))
}

/// GET /api/event/score/:id?staff_id= - total score in an event
pub async fn score(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Query(query): Query<ScoreQuery>,
) -> ApiResult<StaffScore> {
    state.authorizer.require(&caller, &[]).await?;
    let staff_id = query.staff_id.unwrap_or(caller.staff_id);
    Ok(ApiResponse::success(
        state.services.events.get_staff_score(id, staff_id).await?,
    ))
}

/// DELETE /api/event/remove/:id - take a staff member off the event roster
pub async fn remove_staff(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<StaffRef>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, policy::EVENT_REMOVE_STAFF).await?;
    state
        .services
        .events
        .remove_staff_from_event(body.staff_id, id)
        .await?;
    Ok(ApiResponse::success(Ack::of(id)))
}
