// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here runs behind jwt_auth_middleware, which injects AuthStaff.
// Each handler then checks the caller's permissions through the Authorizer
// before calling into a service. Route prefix: /api/*
pub mod events;
pub mod organizations;
pub mod positions;
pub mod prizes;
pub mod staff;
pub mod steps;
pub mod teams;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body naming a single staff member, e.g. `{"staff_id": "..."}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StaffRef {
    pub staff_id: Uuid,
}

/// Acknowledgement for operations that return nothing else.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub id: Uuid,
    pub done: bool,
}

impl Ack {
    pub fn of(id: Uuid) -> Self {
        Self { id, done: true }
    }
}
