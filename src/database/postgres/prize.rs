use async_trait::async_trait;
use uuid::Uuid;

use super::{PgStore, PRIZE_COLUMNS};
use crate::database::models::{AwardOutcome, AwardedPrize, Prize, PrizeType, StaffPrize};
use crate::database::store::{PrizeStore, StoreResult};

#[async_trait]
impl PrizeStore for PgStore {
    async fn insert_prize(&self, prize: &Prize) -> StoreResult<()> {
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
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_prize(&self, id: Uuid) -> StoreResult<Option<Prize>> {
        let sql = format!("SELECT {} FROM prizes p WHERE p.id = $1", PRIZE_COLUMNS);
        Ok(sqlx::query_as::<_, Prize>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_prizes(&self) -> StoreResult<Vec<Prize>> {
        let sql = format!("SELECT {} FROM prizes p ORDER BY p.creation_date", PRIZE_COLUMNS);
        Ok(sqlx::query_as::<_, Prize>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_prizes_by_step(&self, step_id: Uuid) -> StoreResult<Vec<Prize>> {
        let sql = format!(
            "SELECT {} FROM prizes p WHERE p.step_id = $1 ORDER BY p.creation_date",
            PRIZE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Prize>(&sql)
            .bind(step_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_prizes_by_creator(&self, staff_id: Uuid) -> StoreResult<Vec<Prize>> {
        let sql = format!(
            "SELECT {} FROM prizes p WHERE p.created_by = $1 ORDER BY p.creation_date",
            PRIZE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Prize>(&sql)
            .bind(staff_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_prizes_by_type(&self, prize_type: PrizeType) -> StoreResult<Vec<Prize>> {
        let sql = format!(
            "SELECT {} FROM prizes p WHERE p.prize_type = $1 ORDER BY p.creation_date",
            PRIZE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Prize>(&sql)
            .bind(prize_type)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_prize(&self, prize: &Prize) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE prizes SET name = $2, description = $3, data = $4, prize_type = $5, prize_status = $6 WHERE id = $1",
        )
        .bind(prize.id)
        .bind(&prize.name)
        .bind(&prize.description)
        .bind(&prize.data)
        .bind(prize.prize_type)
        .bind(prize.prize_status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_prize(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM prizes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn award_prize(&self, award: &StaffPrize) -> StoreResult<AwardOutcome> {
        let mut tx = self.pool.begin().await?;

        // The decrement only matches while units remain, so concurrent awards
        // can never push the count below zero.
        let sql = format!(
            "UPDATE prizes p SET current_count = p.current_count - 1 \
             WHERE p.id = $1 AND p.current_count > 0 RETURNING {}",
            PRIZE_COLUMNS
        );
        let taken = sqlx::query_as::<_, Prize>(&sql)
            .bind(award.prize_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(prize) = taken else {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM prizes WHERE id = $1")
                .bind(award.prize_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Ok(match exists {
                Some(_) => AwardOutcome::Exhausted,
                None => AwardOutcome::Missing,
            });
        };

        sqlx::query("INSERT INTO staff_prizes (id, staff_id, prize_id, awarded_at) VALUES ($1, $2, $3, $4)")
            .bind(award.id)
            .bind(award.staff_id)
            .bind(award.prize_id)
            .bind(award.awarded_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(AwardOutcome::Awarded {
            prize,
            award: award.clone(),
        })
    }

    async fn list_staff_prizes(&self, staff_id: Uuid) -> StoreResult<Vec<AwardedPrize>> {
        let sql = format!(
            "SELECT sp.id AS award_id, sp.awarded_at, {} FROM staff_prizes sp \
             JOIN prizes p ON p.id = sp.prize_id WHERE sp.staff_id = $1 ORDER BY sp.awarded_at",
            PRIZE_COLUMNS
        );
        Ok(sqlx::query_as::<_, AwardedPrize>(&sql)
            .bind(staff_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
