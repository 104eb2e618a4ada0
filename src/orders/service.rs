/**
 * USE CASE LAYER - Reservation Engine
 *
 * ReservationEngine: converts a buyer's intent into an atomically reserved
 * inventory hold with a deadline.
 *
 * Architecture Layer: Use Case (Layer 3)
 * Dependencies: InventoryStore, OrderRepository, LockService
 */

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::inventory::InventoryStore;
use crate::lock::LockService;

use super::dto::{CreateOrderRequest, Order, OrderItem};
use super::repository::OrderRepository;

pub struct ReservationEngine {
    orders: OrderRepository,
    inventory: InventoryStore,
    lock: LockService,
    reservation_ttl: Duration,
    lock_ttl: Duration,
    platform_fee_rate: Decimal,
    service_fee: Decimal,
}

impl ReservationEngine {
    pub fn new(
        orders: OrderRepository,
        inventory: InventoryStore,
        lock: LockService,
        reservation_ttl: Duration,
        lock_ttl: Duration,
        platform_fee_rate: Decimal,
        service_fee: Decimal,
    ) -> Self {
        Self {
            orders,
            inventory,
            lock,
            reservation_ttl,
            lock_ttl,
            platform_fee_rate,
            service_fee,
        }
    }

    pub async fn reserve(
        &self,
        user_id: Uuid,
        req: CreateOrderRequest,
    ) -> Result<(Order, Vec<OrderItem>)> {
        if req.items.is_empty() {
            return Err(AppError::Validation("order must contain at least one item".into()));
        }
        for item in &req.items {
            if item.quantity < 1 {
                return Err(AppError::Validation("quantity must be at least 1".into()));
            }
        }

        // Deterministic tier order prevents deadlock between reservations
        // touching overlapping tier sets.
        let mut tier_ids: Vec<Uuid> = req.items.iter().map(|i| i.ticket_tier_id).collect();
        tier_ids.sort();
        tier_ids.dedup();

        let leases = self.acquire_all(&tier_ids).await?;

        let result = self.reserve_under_locks(user_id, &req).await;

        for lease in leases {
            lease.release().await;
        }

        result
    }

    async fn acquire_all(&self, tier_ids: &[Uuid]) -> Result<Vec<crate::lock::service::Lease>> {
        let mut held = Vec::with_capacity(tier_ids.len());
        let deadline = Instant::now() + Duration::from_secs(5);

        for tier_id in tier_ids {
            let key = format!("tier:{tier_id}");
            loop {
                match self.lock.acquire(&key, self.lock_ttl).await? {
                    Some(lease) => {
                        held.push(lease);
                        break;
                    }
                    None => {
                        if Instant::now() >= deadline {
                            for lease in held {
                                lease.release().await;
                            }
                            return Err(AppError::LockAcquisitionFailed);
                        }
                        sleep(Duration::from_millis(50)).await;
                    }
                }
            }
        }

        Ok(held)
    }

    async fn reserve_under_locks(
        &self,
        user_id: Uuid,
        req: &CreateOrderRequest,
    ) -> Result<(Order, Vec<OrderItem>)> {
        let mut tx = self.inventory.pool().begin().await.map_err(AppError::Database)?;

        let mut sorted_items = req.items.iter().collect::<Vec<_>>();
        sorted_items.sort_by_key(|i| i.ticket_tier_id);

        let mut total_amount = Decimal::ZERO;
        let mut reserved_items = Vec::with_capacity(sorted_items.len());

        for item in &sorted_items {
            let tier = self.inventory.get_for_update(&mut tx, item.ticket_tier_id).await?;

            if item.quantity > tier.max_per_order {
                return Err(AppError::MaxPerOrderExceeded);
            }
            if tier.available() < item.quantity {
                return Err(AppError::InsufficientQuota);
            }

            let subtotal = tier.price * Decimal::from(item.quantity);
            self.inventory.reserve(&mut tx, tier.id, item.quantity).await?;

            total_amount += subtotal;
            reserved_items.push((tier.id, item.quantity, tier.price, subtotal));
        }

        let platform_fee = (total_amount * self.platform_fee_rate).round_dp(2);
        let service_fee = self.service_fee;
        let grand_total = total_amount + platform_fee + service_fee;
        let reservation_expires_at = Utc::now() + chrono::Duration::from_std(self.reservation_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(15));

        let order = self
            .orders
            .create_with_tx(
                &mut tx,
                user_id,
                req.event_id,
                total_amount,
                platform_fee,
                service_fee,
                grand_total,
                reservation_expires_at,
            )
            .await?;

        let mut items = Vec::with_capacity(reserved_items.len());
        for (tier_id, quantity, price, subtotal) in reserved_items {
            let item = self
                .orders
                .create_item_with_tx(&mut tx, order.id, tier_id, quantity, price, subtotal)
                .await?;
            items.push(item);
        }

        tx.commit().await.map_err(AppError::Database)?;

        Ok((order, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fee_calculation_matches_happy_path_scenario() {
        // Tier A: price=50000, quantity=2 -> total=100000
        let total_amount = dec!(100000);
        let platform_fee_rate = dec!(0.05);
        let service_fee = dec!(2500);

        let platform_fee = (total_amount * platform_fee_rate).round_dp(2);
        let grand_total = total_amount + platform_fee + service_fee;

        assert_eq!(platform_fee, dec!(5000));
        assert_eq!(grand_total, dec!(107500));
    }
}
