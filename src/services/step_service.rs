use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::models::{
    Accomplishment, Prize, Step, StepBundle, StepDetail, StepImage, StepStaff, StepStatus,
};
use crate::database::store::*;
use crate::database::DatabaseError;
use crate::services::error::{parse_label, ServiceError, ServiceResult};
use crate::services::prize_service::{build_prize, NewPrize};
use crate::services::validation::{ensure_after, parse_optional_timestamp, parse_timestamp, require_text};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStep {
    pub name: String,
    pub description: Option<String>,
    pub task: Option<String>,
    #[serde(default)]
    pub max_score: i32,
    pub creation_date: Option<String>,
    pub end_date: String,
    #[serde(default)]
    pub prizes: Vec<NewPrize>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub task: Option<String>,
    pub max_score: Option<i32>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Result of grading a staff member on a step.
#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub record: StepStaff,
    /// Next step the staff member was moved to, when the step was completed.
    pub advanced_to: Option<Uuid>,
}

/// Validates a step definition and assembles the rows written with it.
pub(crate) fn build_step_bundle(
    new: &NewStep,
    event_id: Uuid,
    level: i32,
    actor: Uuid,
    now: DateTime<Utc>,
) -> ServiceResult<StepBundle> {
    require_text("name", &new.name)?;
    if new.max_score < 0 {
        return Err(ServiceError::validation("max_score", "must not be negative"));
    }
    let creation_date = parse_optional_timestamp("creation_date", new.creation_date.as_deref())?.unwrap_or(now);
    let end_date = parse_timestamp("end_date", &new.end_date)?;
    ensure_after(end_date, creation_date)?;

    let step = Step {
        id: Uuid::new_v4(),
        event_id,
        name: new.name.clone(),
        description: new.description.clone(),
        task: new.task.clone(),
        max_score: new.max_score,
        level,
        status: StepStatus::Process,
        creation_date,
        end_date,
    };
    let prizes = new
        .prizes
        .iter()
        .map(|prize| build_prize(prize, step.id, actor, now))
        .collect::<ServiceResult<Vec<Prize>>>()?;
    let images = step_images(step.id, &new.images);

    Ok(StepBundle { step, prizes, images })
}

fn step_images(step_id: Uuid, paths: &[String]) -> Vec<StepImage> {
    paths
        .iter()
        .filter(|path| !path.trim().is_empty())
        .map(|path| StepImage {
            id: Uuid::new_v4(),
            step_id,
            path: path.clone(),
        })
        .collect()
}

/// Step lifecycle and staff progression.
#[derive(Clone)]
pub struct StepService {
    store: Arc<dyn Store>,
}

impl StepService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Appends a step after the event's current last level.
    pub async fn create_step(&self, event_id: Uuid, new: NewStep, actor: Uuid) -> ServiceResult<StepBundle> {
        if self.store.find_event(event_id).await?.is_none() {
            return Err(ServiceError::not_found("event", event_id));
        }
        let bundle = build_step_bundle(&new, event_id, 0, actor, Utc::now())?;
        let step = self.store.insert_step(&bundle).await?;
        info!("Created step {} at level {} on event {}", step.id, step.level, event_id);
        Ok(StepBundle { step, ..bundle })
    }

    pub async fn get_step(&self, id: Uuid) -> ServiceResult<StepDetail> {
        let step = self.load_step(id).await?;
        let prizes = self.store.list_prizes_by_step(id).await?;
        let images = self.store.list_step_images(id).await?;
        let active_staff = self.store.list_step_staff(id).await?;
        Ok(StepDetail {
            step,
            prizes,
            images,
            active_staff,
        })
    }

    /// Steps of an event in level order.
    pub async fn get_steps(&self, event_id: Uuid) -> ServiceResult<Vec<Step>> {
        if self.store.find_event(event_id).await?.is_none() {
            return Err(ServiceError::not_found("event", event_id));
        }
        Ok(self.store.list_steps(event_id).await?)
    }

    pub async fn get_step_prizes(&self, step_id: Uuid) -> ServiceResult<Vec<Prize>> {
        self.load_step(step_id).await?;
        Ok(self.store.list_prizes_by_step(step_id).await?)
    }

    pub async fn assign_staff(&self, staff_id: Uuid, step_id: Uuid) -> ServiceResult<StepStaff> {
        self.load_step(step_id).await?;
        if self.store.find_staff(staff_id).await?.is_none() {
            return Err(ServiceError::not_found("staff", staff_id));
        }
        let row = progress_row(staff_id, step_id);
        self.store.insert_step_staff(&row).await.map_err(|err| match err {
            DatabaseError::Conflict(_) => {
                ServiceError::Conflict(format!("staff {} is already assigned to step {}", staff_id, step_id))
            }
            other => other.into(),
        })?;
        debug!("Assigned staff {} to step {}", staff_id, step_id);
        Ok(row)
    }

    /// Grades a staff member on a step. Completing a step moves them onto
    /// the event's next level, if there is one.
    pub async fn pass_staff(
        &self,
        step_id: Uuid,
        staff_id: Uuid,
        accomplishment: &str,
        score: i32,
    ) -> ServiceResult<PassOutcome> {
        let accomplishment: Accomplishment = parse_label("accomplishment", accomplishment)?;
        let step = self.load_step(step_id).await?;
        if score < 0 {
            return Err(ServiceError::validation("score", "must not be negative"));
        }
        if step.max_score > 0 && score > step.max_score {
            return Err(ServiceError::validation(
                "score",
                format!("{} exceeds the step maximum of {}", score, step.max_score),
            ));
        }

        let next = if accomplishment == Accomplishment::Done {
            self.store
                .list_steps(step.event_id)
                .await?
                .into_iter()
                .filter(|candidate| candidate.level > step.level)
                .min_by_key(|candidate| candidate.level)
        } else {
            None
        };
        let advance = next.as_ref().map(|next| progress_row(staff_id, next.id));

        let record = self
            .store
            .record_result(staff_id, step_id, accomplishment, score, advance.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("staff {} is not assigned to step {}", staff_id, step_id))
            })?;

        let advanced_to = next.map(|next| next.id);
        if let Some(next_id) = advanced_to {
            info!("Staff {} completed step {} and moved to step {}", staff_id, step_id, next_id);
        }
        Ok(PassOutcome { record, advanced_to })
    }

    /// Edits an open step; the step is marked changed.
    pub async fn update_step(&self, id: Uuid, patch: StepPatch) -> ServiceResult<Step> {
        let mut step = self.load_step(id).await?;
        if step.status.is_terminal() {
            return Err(ServiceError::InvalidTransition(format!(
                "step {} is {} and can no longer change",
                id, step.status
            )));
        }

        if let Some(name) = patch.name.filter(|n| !n.trim().is_empty()) {
            step.name = name;
        }
        if let Some(description) = patch.description {
            step.description = Some(description);
        }
        if let Some(task) = patch.task {
            step.task = Some(task);
        }
        if let Some(max_score) = patch.max_score {
            if max_score < 0 {
                return Err(ServiceError::validation("max_score", "must not be negative"));
            }
            step.max_score = max_score;
        }
        if let Some(end) = parse_optional_timestamp("end_date", patch.end_date.as_deref())? {
            ensure_after(end, step.creation_date)?;
            step.end_date = end;
        }
        step.status = StepStatus::Changed;

        let images = step_images(id, &patch.images);
        if !self.store.update_step(&step, &images).await? {
            return Err(self.closed_or_missing(id).await);
        }
        Ok(step)
    }

    pub async fn cancel_step(&self, id: Uuid) -> ServiceResult<Step> {
        let mut step = self.load_step(id).await?;
        if !self.store.close_step(id, StepStatus::Canceled).await? {
            return Err(self.closed_or_missing(id).await);
        }
        step.status = StepStatus::Canceled;
        info!("Canceled step {}", id);
        Ok(step)
    }

    pub async fn delete_step(&self, id: Uuid) -> ServiceResult<()> {
        if !self.store.delete_step(id).await? {
            return Err(ServiceError::not_found("step", id));
        }
        info!("Deleted step {}", id);
        Ok(())
    }

    /// Finishes every open step whose end date has passed.
    pub async fn finish_due_steps(&self, now: DateTime<Utc>) -> ServiceResult<u64> {
        let finished = self.store.finish_due_steps(now).await?;
        if finished > 0 {
            info!("Finished {} steps past their end date", finished);
        }
        Ok(finished)
    }

    async fn load_step(&self, id: Uuid) -> ServiceResult<Step> {
        self.store
            .find_step(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("step", id))
    }

    async fn closed_or_missing(&self, id: Uuid) -> ServiceError {
        match self.store.find_step(id).await {
            Ok(Some(step)) => ServiceError::InvalidTransition(format!("step {} is already {}", id, step.status)),
            Ok(None) => ServiceError::not_found("step", id),
            Err(err) => {
                warn!("Failed to reload step {}: {}", id, err);
                err.into()
            }
        }
    }
}

fn progress_row(staff_id: Uuid, step_id: Uuid) -> StepStaff {
    StepStaff {
        id: Uuid::new_v4(),
        step_id,
        staff_id,
        accomplishment: Accomplishment::Process,
        score: 0,
        start_date: Utc::now(),
    }
}
