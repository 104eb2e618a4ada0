use async_trait::async_trait;

use crate::orders::dto::Order;
use crate::tickets::dto::Ticket;

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_ticket_email(
        &self,
        order: &Order,
        tickets: &[Ticket],
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
#[error("notification dispatch failed: {0}")]
pub struct NotificationError(pub String);

/// Production implementation: a best-effort internal RPC-shaped call to a
/// configured notification service. Failure never rolls back the order; the
/// caller logs and (best-effort, non-durable) queues for retry.
pub struct HttpNotificationDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotificationDispatcher {
    pub fn new(base_url: String) -> Self {
        Self { client: reqwest::Client::new(), base_url }
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn send_ticket_email(
        &self,
        order: &Order,
        tickets: &[Ticket],
    ) -> Result<(), NotificationError> {
        if self.base_url.is_empty() {
            tracing::warn!(order_id = %order.id, "notification service url not configured, skipping dispatch");
            return Ok(());
        }

        let payload = serde_json::json!({
            "order_id": order.id,
            "user_id": order.user_id,
            "tickets": tickets.iter().map(|t| serde_json::json!({
                "ticket_id": t.id,
                "ticket_number": t.ticket_number,
                "qr_code": t.qr_code,
            })).collect::<Vec<_>>(),
        });

        self.client
            .post(format!("{}/notifications/tickets", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError(e.to_string()))?
            .error_for_status()
            .map_err(|e| NotificationError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
pub struct FakeNotificationDispatcher {
    pub calls: std::sync::Mutex<Vec<uuid::Uuid>>,
}

#[cfg(test)]
#[async_trait]
impl NotificationDispatcher for FakeNotificationDispatcher {
    async fn send_ticket_email(
        &self,
        order: &Order,
        _tickets: &[Ticket],
    ) -> Result<(), NotificationError> {
        self.calls.lock().unwrap().push(order.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::dto::OrderStatus;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn sample_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            total_amount: Decimal::ZERO,
            platform_fee: Decimal::ZERO,
            service_fee: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            status: OrderStatus::Paid,
            payment_id: None,
            payment_method: None,
            reservation_expires_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn fake_dispatcher_records_dispatched_order_ids() {
        let fake = FakeNotificationDispatcher { calls: std::sync::Mutex::new(Vec::new()) };
        let order = sample_order();
        fake.send_ticket_email(&order, &[]).await.unwrap();
        assert_eq!(fake.calls.lock().unwrap().as_slice(), &[order.id]);
    }

    #[tokio::test]
    async fn http_dispatcher_skips_send_when_base_url_unconfigured() {
        let dispatcher = HttpNotificationDispatcher::new(String::new());
        let order = sample_order();
        assert!(dispatcher.send_ticket_email(&order, &[]).await.is_ok());
    }
}
