use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{AwardOutcome, AwardedPrize, Prize, PrizeType, StaffPrize};
use crate::database::store::*;
use crate::services::error::{parse_label, ServiceError, ServiceResult};
use crate::services::validation::{require_text, validate_uri};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPrize {
    pub name: String,
    pub description: Option<String>,
    #[serde(alias = "type")]
    pub prize_type: String,
    #[serde(alias = "status")]
    pub prize_status: String,
    #[serde(default)]
    pub count: i32,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrizePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "type")]
    pub prize_type: Option<String>,
    #[serde(alias = "status")]
    pub prize_status: Option<String>,
    pub data: Option<String>,
}

fn check_payload(prize: &Prize) -> ServiceResult<()> {
    if prize.prize_type.requires_uri() {
        match prize.data.as_deref() {
            Some(data) => validate_uri("data", data)?,
            None => {
                return Err(ServiceError::validation(
                    "data",
                    format!("{} prizes need an image URI", prize.prize_type),
                ))
            }
        }
    }
    Ok(())
}

/// Validates a prize definition for a step; the full count is available.
pub(crate) fn build_prize(new: &NewPrize, step_id: Uuid, actor: Uuid, now: DateTime<Utc>) -> ServiceResult<Prize> {
    require_text("name", &new.name)?;
    if new.count < 0 {
        return Err(ServiceError::validation("count", "must not be negative"));
    }
    let prize = Prize {
        id: Uuid::new_v4(),
        step_id,
        name: new.name.clone(),
        description: new.description.clone(),
        creation_date: now,
        prize_type: parse_label("prize_type", &new.prize_type)?,
        prize_status: parse_label("prize_status", &new.prize_status)?,
        created_by: actor,
        count: new.count,
        current_count: new.count,
        data: new.data.clone().filter(|d| !d.trim().is_empty()),
    };
    check_payload(&prize)?;
    Ok(prize)
}

/// Prize catalogue and the award ledger.
#[derive(Clone)]
pub struct PrizeService {
    store: Arc<dyn Store>,
}

impl PrizeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_prize(&self, step_id: Uuid, new: NewPrize, actor: Uuid) -> ServiceResult<Prize> {
        if self.store.find_step(step_id).await?.is_none() {
            return Err(ServiceError::not_found("step", step_id));
        }
        let prize = build_prize(&new, step_id, actor, Utc::now())?;
        self.store.insert_prize(&prize).await?;
        info!("Created {} prize {} x{} on step {}", prize.prize_status, prize.id, prize.count, step_id);
        Ok(prize)
    }

    pub async fn get_prize(&self, id: Uuid) -> ServiceResult<Prize> {
        self.store
            .find_prize(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("prize", id))
    }

    pub async fn get_prizes(&self) -> ServiceResult<Vec<Prize>> {
        Ok(self.store.list_prizes().await?)
    }

    pub async fn get_prizes_by_creator(&self, staff_id: Uuid) -> ServiceResult<Vec<Prize>> {
        Ok(self.store.list_prizes_by_creator(staff_id).await?)
    }

    pub async fn get_prizes_by_type(&self, prize_type: &str) -> ServiceResult<Vec<Prize>> {
        let prize_type: PrizeType = parse_label("prize_type", prize_type)?;
        Ok(self.store.list_prizes_by_type(prize_type).await?)
    }

    /// Changes what a prize looks like. Counts are fixed once created.
    pub async fn update_prize(&self, id: Uuid, patch: PrizePatch) -> ServiceResult<Prize> {
        let mut prize = self.get_prize(id).await?;
        if let Some(name) = patch.name.filter(|n| !n.trim().is_empty()) {
            prize.name = name;
        }
        if let Some(description) = patch.description {
            prize.description = Some(description);
        }
        if let Some(raw) = patch.prize_type.as_deref() {
            prize.prize_type = parse_label("prize_type", raw)?;
        }
        if let Some(raw) = patch.prize_status.as_deref() {
            prize.prize_status = parse_label("prize_status", raw)?;
        }
        if let Some(data) = patch.data.filter(|d| !d.trim().is_empty()) {
            prize.data = Some(data);
        }
        check_payload(&prize)?;

        if !self.store.update_prize(&prize).await? {
            return Err(ServiceError::not_found("prize", id));
        }
        Ok(prize)
    }

    pub async fn delete_prize(&self, id: Uuid) -> ServiceResult<()> {
        if !self.store.delete_prize(id).await? {
            return Err(ServiceError::not_found("prize", id));
        }
        Ok(())
    }

    /// Hands one unit of a prize to a staff member.
    pub async fn give_prize(&self, staff_id: Uuid, prize_id: Uuid) -> ServiceResult<AwardedPrize> {
        if self.store.find_staff(staff_id).await?.is_none() {
            return Err(ServiceError::not_found("staff", staff_id));
        }
        let award = StaffPrize {
            id: Uuid::new_v4(),
            staff_id,
            prize_id,
            awarded_at: Utc::now(),
        };
        match self.store.award_prize(&award).await? {
            AwardOutcome::Awarded { prize, award } => {
                info!(
                    "Awarded prize {} to staff {} ({} left)",
                    prize_id, staff_id, prize.current_count
                );
                Ok(AwardedPrize {
                    award_id: award.id,
                    awarded_at: award.awarded_at,
                    prize,
                })
            }
            AwardOutcome::Exhausted => Err(ServiceError::Exhausted(format!("prize {} has no units left", prize_id))),
            AwardOutcome::Missing => Err(ServiceError::not_found("prize", prize_id)),
        }
    }

    pub async fn get_staff_prizes(&self, staff_id: Uuid) -> ServiceResult<Vec<AwardedPrize>> {
        Ok(self.store.list_staff_prizes(staff_id).await?)
    }
}
