use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use super::Ack;
use crate::app::AppState;
use crate::database::models::Team;
use crate::middleware::{policy, ApiResponse, ApiResult, AuthStaff};
use crate::services::team_service::{NewTeam, TeamPatch};

/// POST /api/team
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Json(body): Json<NewTeam>,
) -> ApiResult<Team> {
    state.authorizer.require(&caller, policy::TEAM_CREATE).await?;
    Ok(ApiResponse::created(state.services.teams.create_team(body).await?))
}

/// GET /api/team/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Team> {
    state.authorizer.require(&caller, policy::TEAM_GET).await?;
    Ok(ApiResponse::success(state.services.teams.get_team(id).await?))
}

/// GET /api/team/org/:id
pub async fn by_organization(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Team>> {
    state.authorizer.require(&caller, policy::TEAM_LIST).await?;
    Ok(ApiResponse::success(
        state.services.teams.get_teams_by_organization(id).await?,
    ))
}

/// GET /api/team/event/:id - teams represented on an event's roster
pub async fn by_event(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Team>> {
    state.authorizer.require(&caller, policy::TEAM_LIST).await?;
    Ok(ApiResponse::success(state.services.teams.get_teams_by_event(id).await?))
}

/// PUT /api/team/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(body): Json<TeamPatch>,
) -> ApiResult<Team> {
    state.authorizer.require(&caller, policy::TEAM_UPDATE).await?;
    Ok(ApiResponse::success(state.services.teams.update_team(id, body).await?))
}

/// DELETE /api/team/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ack> {
    state.authorizer.require(&caller, policy::TEAM_DELETE).await?;
    state.services.teams.delete_team(id).await?;
    Ok(ApiResponse::success(Ack::of(id)))
}
