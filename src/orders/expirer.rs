/**
 * Reservation Expirer: background task releasing holds whose deadline has passed.
 *
 * Runs on its own tokio interval, sharing the pool and lock client with the
 * rest of the process. Safe to run one instance per replica: every release
 * re-validates the order's status and deadline under its own row lock, and
 * a per-order lease prevents racing with a concurrent Confirmation.
 */

use std::time::Duration;

use crate::inventory::InventoryStore;
use crate::lock::LockService;
use crate::orders::dto::OrderStatus;
use crate::orders::repository::OrderRepository;

pub struct ReservationExpirer {
    orders: OrderRepository,
    inventory: InventoryStore,
    lock: LockService,
    batch_size: i64,
}

impl ReservationExpirer {
    pub fn new(
        orders: OrderRepository,
        inventory: InventoryStore,
        lock: LockService,
        batch_size: i64,
    ) -> Self {
        Self { orders, inventory, lock, batch_size }
    }

    /// Spawns the periodic sweep loop. Returns the join handle so the
    /// caller can decide whether to await it (it never returns in practice).
    pub fn spawn(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep_once().await {
                    tracing::error!(error = %e, "reservation expirer sweep failed");
                }
            }
        })
    }

    pub async fn sweep_once(&self) -> crate::error::Result<usize> {
        let candidates = self.orders.list_expired_reserved(self.batch_size).await?;
        let mut expired = 0;

        for order_id in candidates {
            let lease_key = format!("order:{order_id}");
            let lease = match self.lock.acquire(&lease_key, Duration::from_secs(10)).await {
                Ok(Some(lease)) => lease,
                Ok(None) => continue, // a confirmation may be racing
                Err(e) => {
                    tracing::warn!(order_id = %order_id, error = %e, "expirer lock acquisition failed");
                    continue;
                }
            };

            match self.expire_one(order_id).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(order_id = %order_id, error = %e, "failed to expire order"),
            }

            lease.release().await;
        }

        Ok(expired)
    }

    async fn expire_one(&self, order_id: uuid::Uuid) -> crate::error::Result<bool> {
        let mut tx = self.orders.pool().begin().await.map_err(crate::error::AppError::Database)?;

        let order = self.orders.get_for_update(&mut tx, order_id).await?;
        if order.status != OrderStatus::Reserved {
            tx.rollback().await.map_err(crate::error::AppError::Database)?;
            return Ok(false);
        }
        let expires_at = match order.reservation_expires_at {
            Some(t) => t,
            None => {
                tx.rollback().await.map_err(crate::error::AppError::Database)?;
                return Ok(false);
            }
        };
        if chrono::Utc::now() < expires_at {
            tx.rollback().await.map_err(crate::error::AppError::Database)?;
            return Ok(false);
        }

        let items = self.orders.get_items_tx(&mut tx, order_id).await?;
        for item in items {
            self.inventory.release(&mut tx, item.ticket_tier_id, item.quantity).await?;
        }

        self.orders.mark_expired_tx(&mut tx, order_id).await?;
        tx.commit().await.map_err(crate::error::AppError::Database)?;

        Ok(true)
    }
}
