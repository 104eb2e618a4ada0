/**
 * Inventory Store: durable per-tier (quota, sold_count) counters.
 *
 * Architecture Layer: Repository (Layer 5)
 * Responsibility: row-locked reads and conditional updates so that no
 * caller can ever push sold_count past quota, even under concurrent access.
 */

pub mod dto;
pub mod repository;

pub use dto::TicketTier;
pub use repository::InventoryStore;
