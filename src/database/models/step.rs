use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::prize::Prize;

crate::wire_enum! {
    /// Lifecycle of a step. `Finished` and `Canceled` are terminal.
    pub enum StepStatus as "step_status" {
        Process = "process",
        Finished = "finished",
        Canceled = "canceled",
        Changed = "changed",
    }
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Finished | StepStatus::Canceled)
    }
}

crate::wire_enum! {
    /// Outcome of a step for one staff member.
    pub enum Accomplishment as "accomplishment" {
        Process = "process" | "in-process",
        ReadyCheck = "ready-check" | "ready-to-check",
        Done = "done",
        Failed = "failed",
        Cheated = "cheated",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Step {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub task: Option<String>,
    pub max_score: i32,
    pub level: i32,
    pub status: StepStatus,
    pub creation_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StepImage {
    pub id: Uuid,
    pub step_id: Uuid,
    pub path: String,
}

/// Progress record of one staff member on one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StepStaff {
    pub id: Uuid,
    pub step_id: Uuid,
    pub staff_id: Uuid,
    pub accomplishment: Accomplishment,
    pub score: i32,
    pub start_date: DateTime<Utc>,
}

/// A step with the rows written together with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepBundle {
    #[serde(flatten)]
    pub step: Step,
    pub prizes: Vec<Prize>,
    pub images: Vec<StepImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDetail {
    #[serde(flatten)]
    pub step: Step,
    pub prizes: Vec<Prize>,
    pub images: Vec<StepImage>,
    pub active_staff: Vec<StepStaff>,
}
