use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{AppError, Result};
use super::dto::TicketTier;

/// Inventory Store: exclusively owns Ticket Tier counter mutations.
#[derive(Clone)]
pub struct InventoryStore {
    pool: PgPool,
}

impl InventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Read a tier row with an exclusive lock. Must be called inside the
    /// transaction that will perform the subsequent reserve/release.
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tier_id: Uuid,
    ) -> Result<TicketTier> {
        let row = sqlx::query(
            r#"SELECT id, event_id, name, price, quota, sold_count, max_per_order
               FROM ticket_tiers WHERE id = $1 FOR UPDATE"#,
        )
        .bind(tier_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("ticket tier not found".into()))?;

        Ok(row_to_tier(&row))
    }

    /// Atomically increments `sold_count` by `n`, conditional on
    /// `sold_count + n <= quota`. Must run inside a transaction that already
    /// holds the row lock from `get_for_update`.
    pub async fn reserve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tier_id: Uuid,
        n: i32,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE ticket_tiers SET sold_count = sold_count + $2
               WHERE id = $1 AND sold_count + $2 <= quota"#,
        )
        .bind(tier_id)
        .bind(n)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::InsufficientQuota);
        }
        Ok(())
    }

    /// Atomically decrements `sold_count` by `n`, clamped at zero. Idempotent
    /// with respect to extra releases.
    pub async fn release(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tier_id: Uuid,
        n: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE ticket_tiers SET sold_count = GREATEST(sold_count - $2, 0) WHERE id = $1"#,
        )
        .bind(tier_id)
        .bind(n)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn get(&self, tier_id: Uuid) -> Result<TicketTier> {
        let row = sqlx::query(
            r#"SELECT id, event_id, name, price, quota, sold_count, max_per_order
               FROM ticket_tiers WHERE id = $1"#,
        )
        .bind(tier_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("ticket tier not found".into()))?;

        Ok(row_to_tier(&row))
    }
}

fn row_to_tier(row: &sqlx::postgres::PgRow) -> TicketTier {
    TicketTier {
        id: row.get("id"),
        event_id: row.get("event_id"),
        name: row.get("name"),
        price: row.get("price"),
        quota: row.get("quota"),
        sold_count: row.get("sold_count"),
        max_per_order: row.get("max_per_order"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn available_never_goes_negative() {
        let tier = TicketTier {
            id: Uuid::nil(),
            event_id: Uuid::nil(),
            name: "VIP".into(),
            price: dec!(100),
            quota: 10,
            sold_count: 12,
            max_per_order: 4,
        };
        assert_eq!(tier.available(), 0);
    }
}
