use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::event::write_bundle;
use super::{PgStore, STEP_COLUMNS};
use crate::database::models::{Accomplishment, Step, StepBundle, StepImage, StepStaff, StepStatus};
use crate::database::store::{StepStore, StoreResult};
use crate::database::DatabaseError;

const STEP_STAFF_COLUMNS: &str = "id, step_id, staff_id, accomplishment, score, start_date";

#[async_trait]
impl StepStore for PgStore {
    async fn insert_step(&self, bundle: &StepBundle) -> StoreResult<Step> {
        let event_id = bundle.step.event_id;
        let mut tx = self.pool.begin().await?;

        // Serializes level allocation per event.
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(DatabaseError::ForeignKey("steps_event_id_fkey".to_string()));
        }

        let (last,): (i32,) = sqlx::query_as("SELECT COALESCE(MAX(level), 0) FROM steps WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

        let mut stored = bundle.clone();
        stored.step.level = last + 1;
        write_bundle(&mut tx, &stored).await?;

        tx.commit().await?;
        Ok(stored.step)
    }

    async fn find_step(&self, id: Uuid) -> StoreResult<Option<Step>> {
        let sql = format!("SELECT {} FROM steps WHERE id = $1", STEP_COLUMNS);
        Ok(sqlx::query_as::<_, Step>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_steps(&self, event_id: Uuid) -> StoreResult<Vec<Step>> {
        let sql = format!("SELECT {} FROM steps WHERE event_id = $1 ORDER BY level", STEP_COLUMNS);
        Ok(sqlx::query_as::<_, Step>(&sql)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_step_images(&self, step_id: Uuid) -> StoreResult<Vec<StepImage>> {
        Ok(sqlx::query_as::<_, StepImage>("SELECT id, step_id, path FROM step_images WHERE step_id = $1")
            .bind(step_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_step(&self, step: &Step, new_images: &[StepImage]) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE steps SET name = $2, description = $3, task = $4, max_score = $5, status = $6, end_date = $7 \
             WHERE id = $1 AND status IN ('process', 'changed')",
        )
        .bind(step.id)
        .bind(&step.name)
        .bind(&step.description)
        .bind(&step.task)
        .bind(step.max_score)
        .bind(step.status)
        .bind(step.end_date)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for image in new_images {
            sqlx::query("INSERT INTO step_images (id, step_id, path) VALUES ($1, $2, $3)")
                .bind(image.id)
                .bind(image.step_id)
                .bind(&image.path)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn close_step(&self, id: Uuid, to: StepStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE steps SET status = $2 WHERE id = $1 AND status IN ('process', 'changed')")
            .bind(id)
            .bind(to)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_step(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM steps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_step_staff(&self, row: &StepStaff) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO step_staff (id, step_id, staff_id, accomplishment, score, start_date) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(row.id)
        .bind(row.step_id)
        .bind(row.staff_id)
        .bind(row.accomplishment)
        .bind(row.score)
        .bind(row.start_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_step_staff(&self, step_id: Uuid) -> StoreResult<Vec<StepStaff>> {
        let sql = format!(
            "SELECT {} FROM step_staff WHERE step_id = $1 ORDER BY start_date",
            STEP_STAFF_COLUMNS
        );
        Ok(sqlx::query_as::<_, StepStaff>(&sql)
            .bind(step_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn record_result(
        &self,
        staff_id: Uuid,
        step_id: Uuid,
        accomplishment: Accomplishment,
        score: i32,
        advance: Option<&StepStaff>,
    ) -> StoreResult<Option<StepStaff>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE step_staff SET accomplishment = $3, score = $4 WHERE staff_id = $1 AND step_id = $2 RETURNING {}",
            STEP_STAFF_COLUMNS
        );
        let updated = sqlx::query_as::<_, StepStaff>(&sql)
            .bind(staff_id)
            .bind(step_id)
            .bind(accomplishment)
            .bind(score)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(updated) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(next) = advance {
            sqlx::query(
                "INSERT INTO step_staff (id, step_id, staff_id, accomplishment, score, start_date) \
                 VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (staff_id, step_id) DO NOTHING",
            )
            .bind(next.id)
            .bind(next.step_id)
            .bind(next.staff_id)
            .bind(next.accomplishment)
            .bind(next.score)
            .bind(next.start_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn finish_due_steps(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE steps SET status = 'finished' WHERE status IN ('process', 'changed') AND end_date <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
