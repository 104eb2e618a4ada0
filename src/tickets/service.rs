/**
 * USE CASE LAYER - Ticket Issuance
 *
 * On a paid order, materializes one ticket per unit of quantity, each with
 * a unique id and a QR payload encoding `(ticket_id, event_id)`.
 */

use uuid::Uuid;

use crate::error::Result;
use crate::orders::repository::OrderRepository;

use super::dto::Ticket;
use super::qr;
use super::repository::{NewTicket, TicketRepository};

#[derive(Clone)]
pub struct TicketIssuance {
    tickets: TicketRepository,
    orders: OrderRepository,
}

impl TicketIssuance {
    pub fn new(tickets: TicketRepository, orders: OrderRepository) -> Self {
        Self { tickets, orders }
    }

    /// Idempotent: if the order already has exactly `Σ quantity` tickets,
    /// returns them without side effects.
    ///
    /// The idempotency check and the insert run under the same transaction,
    /// serialized by a row lock on the order: two concurrent replays (e.g. a
    /// webhook retry racing a crash-recovery re-issue) cannot both observe
    /// zero existing tickets and both insert a full batch.
    pub async fn issue_for_order(&self, order_id: Uuid) -> Result<Vec<Ticket>> {
        let mut tx = self.tickets.pool().begin().await.map_err(crate::error::AppError::Database)?;

        let order = self.orders.get_for_update(&mut tx, order_id).await?;
        let items = self.orders.get_items_tx(&mut tx, order_id).await?;
        let total_quantity: i64 = items.iter().map(|i| i.quantity as i64).sum();

        let existing_count = self.tickets.count_for_order_tx(&mut tx, order_id).await?;
        if existing_count == total_quantity {
            tx.rollback().await.map_err(crate::error::AppError::Database)?;
            return self.tickets.list_for_order(order_id).await;
        }

        let mut new_tickets = Vec::with_capacity(total_quantity as usize);
        let mut seq: u32 = 0;
        let order_prefix: String = order_id.to_string().chars().take(8).collect();

        for item in &items {
            for _ in 0..item.quantity {
                seq += 1;
                let ticket_id = Uuid::new_v4();
                let qr_data = qr::payload(&ticket_id.to_string(), &order.event_id.to_string());
                let qr_code = qr::render_base64(&qr_data)?;
                let ticket_number = format!("TKT-{order_prefix}-{seq:03}");

                new_tickets.push(NewTicket {
                    id: ticket_id,
                    order_id,
                    order_item_id: item.id,
                    ticket_tier_id: item.ticket_tier_id,
                    event_id: order.event_id,
                    user_id: order.user_id,
                    ticket_number,
                    qr_code,
                    qr_data,
                });
            }
        }

        let created = self.tickets.create_batch_tx(&mut tx, new_tickets).await?;
        tx.commit().await.map_err(crate::error::AppError::Database)?;

        Ok(created)
    }
}
