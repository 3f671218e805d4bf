use async_trait::async_trait;
use uuid::Uuid;

use super::{PgStore, STAFF_COLUMNS};
use crate::database::models::{Membership, Staff, StaffImage};
use crate::database::store::{StaffStore, StoreResult};
use crate::database::DatabaseError;

#[async_trait]
impl StaffStore for PgStore {
    async fn insert_staff(&self, staff: &Staff) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO staff (id, first_name, last_name, email, password_hash, sex, additional_info, \
             organization_id, team_id, position_id, text_color, background_color, current_image, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(staff.id)
        .bind(&staff.first_name)
        .bind(&staff.last_name)
        .bind(&staff.email)
        .bind(&staff.password_hash)
        .bind(staff.sex)
        .bind(&staff.additional_info)
        .bind(staff.organization_id)
        .bind(staff.team_id)
        .bind(staff.position_id)
        .bind(&staff.text_color)
        .bind(&staff.background_color)
        .bind(&staff.current_image)
        .bind(staff.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_staff(&self, id: Uuid) -> StoreResult<Option<Staff>> {
        let sql = format!("SELECT {} FROM staff s WHERE s.id = $1", STAFF_COLUMNS);
        Ok(sqlx::query_as::<_, Staff>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_staff_by_email(&self, email: &str) -> StoreResult<Option<Staff>> {
        let sql = format!("SELECT {} FROM staff s WHERE s.email = $1", STAFF_COLUMNS);
        Ok(sqlx::query_as::<_, Staff>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_staff(&self, staff: &Staff) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE staff SET first_name = $2, last_name = $3, email = $4, password_hash = $5, sex = $6, \
             additional_info = $7, organization_id = $8, team_id = $9, position_id = $10, text_color = $11, \
             background_color = $12, current_image = $13 WHERE id = $1",
        )
        .bind(staff.id)
        .bind(&staff.first_name)
        .bind(&staff.last_name)
        .bind(&staff.email)
        .bind(&staff.password_hash)
        .bind(staff.sex)
        .bind(&staff.additional_info)
        .bind(staff.organization_id)
        .bind(staff.team_id)
        .bind(staff.position_id)
        .bind(&staff.text_color)
        .bind(&staff.background_color)
        .bind(&staff.current_image)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_staff(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_staff_by_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Staff>> {
        let sql = format!(
            "SELECT {} FROM staff s WHERE s.organization_id = $1 ORDER BY s.last_name, s.first_name",
            STAFF_COLUMNS
        );
        Ok(sqlx::query_as::<_, Staff>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_staff_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Staff>> {
        let sql = format!(
            "SELECT {} FROM staff s JOIN staff_events se ON se.staff_id = s.id WHERE se.event_id = $1",
            STAFF_COLUMNS
        );
        Ok(sqlx::query_as::<_, Staff>(&sql)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_staff_by_step(&self, step_id: Uuid) -> StoreResult<Vec<Staff>> {
        let sql = format!(
            "SELECT {} FROM staff s JOIN step_staff ss ON ss.staff_id = s.id WHERE ss.step_id = $1",
            STAFF_COLUMNS
        );
        Ok(sqlx::query_as::<_, Staff>(&sql)
            .bind(step_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn apply_memberships(&self, memberships: &[Membership]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for m in memberships {
            let result = sqlx::query(
                "UPDATE staff SET organization_id = $2, team_id = $3, position_id = $4 WHERE id = $1",
            )
            .bind(m.staff_id)
            .bind(m.organization_id)
            .bind(m.team_id)
            .bind(m.position_id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(DatabaseError::NotFound(format!("staff {}", m.staff_id)));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_staff_image(&self, image: &StaffImage) -> StoreResult<()> {
        sqlx::query("INSERT INTO staff_images (id, staff_id, path, created_at) VALUES ($1, $2, $3, $4)")
            .bind(image.id)
            .bind(image.staff_id)
            .bind(&image.path)
            .bind(image.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_staff_images(&self, staff_id: Uuid) -> StoreResult<Vec<StaffImage>> {
        Ok(sqlx::query_as::<_, StaffImage>(
            "SELECT id, staff_id, path, created_at FROM staff_images WHERE staff_id = $1 ORDER BY created_at",
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
