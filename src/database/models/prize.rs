use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

crate::wire_enum! {
    pub enum PrizeType as "prize_type" {
        Image = "image",
        Medal = "medal",
        Background = "background",
        Text = "text",
    }
}

impl PrizeType {
    /// Image and medal prizes carry a link to their artwork in `data`.
    pub fn requires_uri(&self) -> bool {
        matches!(self, PrizeType::Image | PrizeType::Medal)
    }
}

crate::wire_enum! {
    /// Rarity of a prize.
    pub enum PrizeStatus as "prize_status" {
        Common = "common",
        Rare = "rare",
        Mith = "mith" | "mythic",
        Legendary = "legendary",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Prize {
    pub id: Uuid,
    pub step_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub prize_type: PrizeType,
    pub prize_status: PrizeStatus,
    pub created_by: Uuid,
    pub count: i32,
    pub current_count: i32,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffPrize {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub prize_id: Uuid,
    pub awarded_at: DateTime<Utc>,
}

/// A prize as held by a staff member.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AwardedPrize {
    pub award_id: Uuid,
    pub awarded_at: DateTime<Utc>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub prize: Prize,
}

/// Result of trying to take one unit of a prize.
#[derive(Debug, Clone)]
pub enum AwardOutcome {
    Awarded { prize: Prize, award: StaffPrize },
    Exhausted,
    Missing,
}
