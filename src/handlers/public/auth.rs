use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::database::models::Staff;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::staff_service::NewStaff;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub staff: Staff,
}

/// POST /auth/sign-up - create an account in the default organization and sign in
pub async fn sign_up(State(state): State<AppState>, Json(mut body): Json<NewStaff>) -> ApiResult<TokenResponse> {
    // Self-registration never picks its own membership.
    body.organization_id = None;
    body.team_id = None;
    body.position_id = None;

    let staff = state.services.staff.create_staff(body).await?;
    let token = state.auth.issue_token(staff.id)?;
    info!("Staff {} signed up", staff.id);
    Ok(ApiResponse::created(TokenResponse { token, staff }))
}

/// POST /auth/sign-in - exchange email and password for a bearer token
pub async fn sign_in(State(state): State<AppState>, Json(body): Json<SignInRequest>) -> ApiResult<TokenResponse> {
    let staff = match state.services.staff.authenticate(&body.email, &body.password).await? {
        Some(staff) => staff,
        None => {
            warn!("Failed sign-in for {}", body.email);
            return Err(ApiError::unauthorized("invalid email or password"));
        }
    };
    let token = state.auth.issue_token(staff.id)?;
    Ok(ApiResponse::success(TokenResponse { token, staff }))
}
