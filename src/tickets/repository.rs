/**
 * REPOSITORY LAYER - Data Access
 *
 * TicketRepository: the gatekeeper to the tickets table
 *
 * Architecture Layer: Repository (Layer 5)
 * Dependencies: Database (Infrastructure Layer 6)
 * Responsibility: CRUD operations, SQL queries, data mapping. Exclusively
 * owns Ticket records.
 */

use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{AppError, Result};
use super::dto::{Ticket, TicketStatus};

pub(crate) struct NewTicket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub ticket_tier_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub ticket_number: String,
    pub qr_code: String,
    pub qr_data: String,
}

#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn count_for_order(&self, order_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM tickets WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get("n"))
    }

    /// Same as `count_for_order`, but read inside the caller's transaction so
    /// it observes a consistent snapshot alongside a row lock taken earlier
    /// in that transaction.
    pub(crate) async fn count_for_order_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM tickets WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get("n"))
    }

    pub async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(
            r#"SELECT id, order_id, order_item_id, ticket_tier_id, event_id, user_id,
                      ticket_number, qr_code, qr_data, status, used_at
               FROM tickets WHERE order_id = $1 ORDER BY ticket_number"#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(rows.iter().map(row_to_ticket).collect())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(
            r#"SELECT id, order_id, order_item_id, ticket_tier_id, event_id, user_id,
                      ticket_number, qr_code, qr_data, status, used_at
               FROM tickets WHERE user_id = $1 ORDER BY ticket_number"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(rows.iter().map(row_to_ticket).collect())
    }

    pub(crate) async fn create_batch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tickets: Vec<NewTicket>,
    ) -> Result<Vec<Ticket>> {
        let mut created = Vec::with_capacity(tickets.len());
        for t in tickets {
            let row = sqlx::query(
                r#"INSERT INTO tickets
                    (id, order_id, order_item_id, ticket_tier_id, event_id, user_id,
                     ticket_number, qr_code, qr_data, status)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'valid')
                   RETURNING id, order_id, order_item_id, ticket_tier_id, event_id, user_id,
                             ticket_number, qr_code, qr_data, status, used_at"#,
            )
            .bind(t.id)
            .bind(t.order_id)
            .bind(t.order_item_id)
            .bind(t.ticket_tier_id)
            .bind(t.event_id)
            .bind(t.user_id)
            .bind(t.ticket_number)
            .bind(t.qr_code)
            .bind(t.qr_data)
            .fetch_one(&mut **tx)
            .await
            .map_err(AppError::Database)?;
            created.push(row_to_ticket(&row));
        }
        Ok(created)
    }

    pub async fn get_by_id(&self, ticket_id: Uuid) -> Result<Ticket> {
        let row = sqlx::query(
            r#"SELECT id, order_id, order_item_id, ticket_tier_id, event_id, user_id,
                      ticket_number, qr_code, qr_data, status, used_at
               FROM tickets WHERE id = $1"#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("ticket not found".into()))?;
        Ok(row_to_ticket(&row))
    }

    /// Atomic single-use transition: sets `status=used, used_at=now`
    /// conditional on the current status being `valid`. Returns the updated
    /// ticket, or `TicketAlreadyUsed` if zero rows were affected (another
    /// scanner won the race, or the ticket was already used).
    pub async fn mark_used(&self, ticket_id: Uuid) -> Result<Ticket> {
        let result = sqlx::query(
            "UPDATE tickets SET status = 'used', used_at = NOW() WHERE id = $1 AND status = 'valid'",
        )
        .bind(ticket_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::TicketAlreadyUsed);
        }

        self.get_by_id(ticket_id).await
    }
}

fn row_to_ticket(row: &sqlx::postgres::PgRow) -> Ticket {
    let status_str: String = row.get("status");
    Ticket {
        id: row.get("id"),
        order_id: row.get("order_id"),
        order_item_id: row.get("order_item_id"),
        ticket_tier_id: row.get("ticket_tier_id"),
        event_id: row.get("event_id"),
        user_id: row.get("user_id"),
        ticket_number: row.get("ticket_number"),
        qr_code: row.get("qr_code"),
        qr_data: row.get("qr_data"),
        status: TicketStatus::from_db_str(&status_str).unwrap_or(TicketStatus::Valid),
        used_at: row.get("used_at"),
    }
}
