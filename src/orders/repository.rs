use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{AppError, Result};
use super::dto::{Order, OrderItem, OrderStatus};

/// Order Store: exclusively owns Order and Order Item records.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        event_id: Uuid,
        total_amount: Decimal,
        platform_fee: Decimal,
        service_fee: Decimal,
        grand_total: Decimal,
        reservation_expires_at: DateTime<Utc>,
    ) -> Result<Order> {
        let row = sqlx::query(
            r#"INSERT INTO orders
                (id, user_id, event_id, total_amount, platform_fee, service_fee,
                 grand_total, status, reservation_expires_at, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, 'reserved', $8, NOW(), NOW())
               RETURNING id, user_id, event_id, total_amount, platform_fee, service_fee,
                         grand_total, status, payment_id, payment_method,
                         reservation_expires_at, created_at, updated_at, completed_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .bind(total_amount)
        .bind(platform_fee)
        .bind(service_fee)
        .bind(grand_total)
        .bind(reservation_expires_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(row_to_order(&row))
    }

    pub async fn create_item_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        ticket_tier_id: Uuid,
        quantity: i32,
        price: Decimal,
        subtotal: Decimal,
    ) -> Result<OrderItem> {
        let row = sqlx::query(
            r#"INSERT INTO order_items (id, order_id, ticket_tier_id, quantity, price, subtotal)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, order_id, ticket_tier_id, quantity, price, subtotal"#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(ticket_tier_id)
        .bind(quantity)
        .bind(price)
        .bind(subtotal)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(row_to_item(&row))
    }

    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<Order> {
        let row = sqlx::query(
            r#"SELECT id, user_id, event_id, total_amount, platform_fee, service_fee,
                      grand_total, status, payment_id, payment_method,
                      reservation_expires_at, created_at, updated_at, completed_at
               FROM orders WHERE id = $1 FOR UPDATE"#,
        )
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("order not found".into()))?;

        Ok(row_to_order(&row))
    }

    pub async fn get(&self, order_id: Uuid) -> Result<Order> {
        let row = sqlx::query(
            r#"SELECT id, user_id, event_id, total_amount, platform_fee, service_fee,
                      grand_total, status, payment_id, payment_method,
                      reservation_expires_at, created_at, updated_at, completed_at
               FROM orders WHERE id = $1"#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("order not found".into()))?;

        Ok(row_to_order(&row))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, event_id, total_amount, platform_fee, service_fee,
                      grand_total, status, payment_id, payment_method,
                      reservation_expires_at, created_at, updated_at, completed_at
               FROM orders WHERE user_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.iter().map(row_to_order).collect())
    }

    pub async fn get_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"SELECT id, order_id, ticket_tier_id, quantity, price, subtotal
               FROM order_items WHERE order_id = $1"#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    pub async fn get_items_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"SELECT id, order_id, ticket_tier_id, quantity, price, subtotal
               FROM order_items WHERE order_id = $1"#,
        )
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Up to `limit` orders still `reserved` whose deadline has passed.
    /// Read outside any transaction — the Expirer re-validates each one
    /// under its own row lock before acting.
    pub async fn list_expired_reserved(&self, limit: i64) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"SELECT id FROM orders
               WHERE status = 'reserved' AND reservation_expires_at < NOW()
               ORDER BY reservation_expires_at ASC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    pub async fn mark_expired_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE orders SET status = 'expired', reservation_expires_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn mark_paid_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        payment_id: Uuid,
        payment_method: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE orders SET status = 'paid', payment_id = $2, payment_method = $3,
               reservation_expires_at = NULL, completed_at = NOW(), updated_at = NOW() WHERE id = $1"#,
        )
        .bind(order_id)
        .bind(payment_id)
        .bind(payment_method)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn mark_cancelled_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE orders SET status = 'cancelled', reservation_expires_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }
}

fn row_to_order(row: &sqlx::postgres::PgRow) -> Order {
    let status_str: String = row.get("status");
    Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        event_id: row.get("event_id"),
        total_amount: row.get("total_amount"),
        platform_fee: row.get("platform_fee"),
        service_fee: row.get("service_fee"),
        grand_total: row.get("grand_total"),
        status: OrderStatus::from_db_str(&status_str).unwrap_or(OrderStatus::Reserved),
        payment_id: row.get("payment_id"),
        payment_method: row.get("payment_method"),
        reservation_expires_at: row.get("reservation_expires_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        completed_at: row.get("completed_at"),
    }
}

fn row_to_item(row: &sqlx::postgres::PgRow) -> OrderItem {
    OrderItem {
        id: row.get("id"),
        order_id: row.get("order_id"),
        ticket_tier_id: row.get("ticket_tier_id"),
        quantity: row.get("quantity"),
        price: row.get("price"),
        subtotal: row.get("subtotal"),
    }
}
