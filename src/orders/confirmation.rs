/**
 * USE CASE LAYER - Confirmation Service
 *
 * On confirmed payment: transitions the order reserved -> paid under lock,
 * triggers ticket materialization, and dispatches a best-effort notification.
 */

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::notifications::NotificationDispatcher;
use crate::tickets::service::TicketIssuance;

use super::dto::{Order, OrderStatus};
use super::repository::OrderRepository;

pub struct ConfirmationService {
    orders: OrderRepository,
    issuance: TicketIssuance,
    notifier: std::sync::Arc<dyn NotificationDispatcher>,
}

impl ConfirmationService {
    pub fn new(
        orders: OrderRepository,
        issuance: TicketIssuance,
        notifier: std::sync::Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self { orders, issuance, notifier }
    }

    /// Confirms payment for `order_id`. Idempotent: re-invocation after the
    /// order is already `paid` is a no-op on order state, but still delegates
    /// to Ticket Issuance, which detects already-issued tickets on its own.
    pub async fn confirm(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
        payment_method: &str,
        amount: Decimal,
    ) -> Result<Order> {
        let mut tx = self.orders.pool().begin().await.map_err(AppError::Database)?;
        let order = self.orders.get_for_update(&mut tx, order_id).await?;

        match order.status {
            OrderStatus::Paid | OrderStatus::Completed => {
                tx.commit().await.map_err(AppError::Database)?;
                // Already confirmed; issuance is idempotent, so replaying it
                // here is safe and covers the case of a crashed first attempt.
                self.issuance.issue_for_order(order.id).await?;
                return Ok(order);
            }
            OrderStatus::Reserved => {}
            OrderStatus::Expired | OrderStatus::Cancelled => {
                return Err(AppError::OrderNotInReservedStatus);
            }
        }

        let expires_at = order
            .reservation_expires_at
            .ok_or_else(|| AppError::Internal("reserved order missing expiry".into()))?;
        if chrono::Utc::now() > expires_at {
            return Err(AppError::OrderExpired);
        }
        if amount != order.grand_total {
            return Err(AppError::AmountMismatch);
        }

        self.orders
            .mark_paid_tx(&mut tx, order_id, payment_id, payment_method)
            .await?;
        tx.commit().await.map_err(AppError::Database)?;

        let tickets = self.issuance.issue_for_order(order_id).await?;

        let notifier = self.notifier.clone();
        let order_for_notification = self.orders.get(order_id).await?;
        if let Err(e) = notifier
            .send_ticket_email(&order_for_notification, &tickets)
            .await
        {
            tracing::warn!(order_id = %order_id, error = %e, "notification dispatch failed, queued for retry");
        }

        self.orders.get(order_id).await
    }
}
