//! Postgres implementation of the store traits.

mod event;
mod organization;
mod prize;
mod staff;
mod step;

use sqlx::PgPool;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const STAFF_COLUMNS: &str = "s.id, s.first_name, s.last_name, s.email, s.password_hash, s.sex, \
    s.additional_info, s.organization_id, s.team_id, s.position_id, s.text_color, \
    s.background_color, s.current_image, s.created_at";

const EVENT_COLUMNS: &str = "e.id, e.name, e.description, e.image_path, e.creation_date, \
    e.end_date, e.organization_id, e.created_by, e.event_status, e.event_type";

const STEP_COLUMNS: &str = "id, event_id, name, description, task, max_score, level, status, \
    creation_date, end_date";

const PRIZE_COLUMNS: &str = "p.id, p.step_id, p.name, p.description, p.creation_date, \
    p.prize_type, p.prize_status, p.created_by, p.count, p.current_count, p.data";
