use async_trait::async_trait;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::{PgStore, EVENT_COLUMNS};
use crate::database::models::{Event, InviteStatus, Invitation, StaffEvent, StaffRole, StepBundle};
use crate::database::store::{EventStore, StoreResult};

/// Writes a step and everything bundled with it inside an open transaction.
pub(super) async fn write_bundle(tx: &mut Transaction<'_, Postgres>, bundle: &StepBundle) -> StoreResult<()> {
    let step = &bundle.step;
    sqlx::query(
        "INSERT INTO steps (id, event_id, name, description, task, max_score, level, status, creation_date, end_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(step.id)
    .bind(step.event_id)
    .bind(&step.name)
    .bind(&step.description)
    .bind(&step.task)
    .bind(step.max_score)
    .bind(step.level)
    .bind(step.status)
    .bind(step.creation_date)
    .bind(step.end_date)
    .execute(&mut **tx)
    .await?;

    for prize in &bundle.prizes {
        sqlx::query(
            "INSERT INTO prizes (id, step_id, name, description, creation_date, prize_type, prize_status, \
             created_by, count, current_count, data) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(prize.id)
        .bind(prize.step_id)
        .bind(&prize.name)
        .bind(&prize.description)
        .bind(prize.creation_date)
        .bind(prize.prize_type)
        .bind(prize.prize_status)
        .bind(prize.created_by)
        .bind(prize.count)
        .bind(prize.current_count)
        .bind(&prize.data)
        .execute(&mut **tx)
        .await?;
    }

    for image in &bundle.images {
        sqlx::query("INSERT INTO step_images (id, step_id, path) VALUES ($1, $2, $3)")
            .bind(image.id)
            .bind(image.step_id)
            .bind(&image.path)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[derive(FromRow)]
struct InvitationRow {
    invitation_id: Uuid,
    staff_id: Uuid,
    status: InviteStatus,
    staff_role: StaffRole,
    #[sqlx(flatten)]
    event: Event,
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_event(&self, event: &Event, creator: &StaffEvent, steps: &[StepBundle]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO events (id, name, description, image_path, creation_date, end_date, organization_id, \
             created_by, event_status, event_type) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.image_path)
        .bind(event.creation_date)
        .bind(event.end_date)
        .bind(event.organization_id)
        .bind(event.created_by)
        .bind(event.event_status)
        .bind(event.event_type)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO staff_events (id, staff_id, event_id, status, staff_role) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(creator.id)
        .bind(creator.staff_id)
        .bind(creator.event_id)
        .bind(creator.status)
        .bind(creator.staff_role)
        .execute(&mut *tx)
        .await?;

        for bundle in steps {
            write_bundle(&mut tx, bundle).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let sql = format!("SELECT {} FROM events e WHERE e.id = $1", EVENT_COLUMNS);
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_event(&self, event: &Event) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE events SET name = $2, description = $3, image_path = $4, end_date = $5, organization_id = $6, \
             event_status = $7, event_type = $8 WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.image_path)
        .bind(event.end_date)
        .bind(event.organization_id)
        .bind(event.event_status)
        .bind(event.event_type)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<bool> {
        // roster, steps, progress, images and prizes go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_roster(&self, event_id: Uuid) -> StoreResult<Vec<StaffEvent>> {
        Ok(sqlx::query_as::<_, StaffEvent>(
            "SELECT id, staff_id, event_id, status, staff_role FROM staff_events WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_roster(&self, rows: &[StaffEvent]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO staff_events (id, staff_id, event_id, status, staff_role) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(row.id)
            .bind(row.staff_id)
            .bind(row.event_id)
            .bind(row.status)
            .bind(row.staff_role)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_invitation_status(&self, staff_id: Uuid, event_id: Uuid, status: InviteStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE staff_events SET status = $3 WHERE staff_id = $1 AND event_id = $2")
            .bind(staff_id)
            .bind(event_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_from_event(&self, staff_id: Uuid, event_id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM staff_events WHERE staff_id = $1 AND event_id = $2")
            .bind(staff_id)
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "DELETE FROM step_staff WHERE staff_id = $1 AND step_id IN (SELECT id FROM steps WHERE event_id = $2)",
        )
        .bind(staff_id)
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_invitations(&self, staff_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let sql = format!(
            "SELECT se.id AS invitation_id, se.staff_id, se.status, se.staff_role, {} \
             FROM staff_events se JOIN events e ON e.id = se.event_id \
             WHERE se.staff_id = $1 ORDER BY e.creation_date",
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(staff_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Invitation {
                invitation: StaffEvent {
                    id: row.invitation_id,
                    staff_id: row.staff_id,
                    event_id: row.event.id,
                    status: row.status,
                    staff_role: row.staff_role,
                },
                event: row.event,
            })
            .collect())
    }

    async fn list_events_by_role(&self, staff_id: Uuid, role: StaffRole) -> StoreResult<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events e JOIN staff_events se ON se.event_id = e.id \
             WHERE se.staff_id = $1 AND se.staff_role = $2 ORDER BY e.creation_date",
            EVENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(staff_id)
            .bind(role)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_events_by_team(&self, team_id: Uuid) -> StoreResult<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events e WHERE e.id IN ( \
                 SELECT se.event_id FROM staff_events se JOIN staff s ON s.id = se.staff_id WHERE s.team_id = $1 \
             ) ORDER BY e.creation_date",
            EVENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_events_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events e WHERE e.organization_id = $1 OR e.id IN ( \
                 SELECT se.event_id FROM staff_events se JOIN staff s ON s.id = se.staff_id \
                 WHERE s.organization_id = $1 \
             ) ORDER BY e.creation_date",
            EVENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn staff_score(&self, event_id: Uuid, staff_id: Uuid) -> StoreResult<i64> {
        let (score,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(ss.score), 0)::BIGINT FROM step_staff ss \
             JOIN steps st ON st.id = ss.step_id WHERE st.event_id = $1 AND ss.staff_id = $2",
        )
        .bind(event_id)
        .bind(staff_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(score)
    }
}
