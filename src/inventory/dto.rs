use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A class of tickets within an event: its own price, quota, and per-order cap.
#[derive(Debug, Clone, Serialize)]
pub struct TicketTier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quota: i32,
    pub sold_count: i32,
    pub max_per_order: i32,
}

impl TicketTier {
    pub fn available(&self) -> i32 {
        (self.quota - self.sold_count).max(0)
    }
}
