/**
 * Order Store + Reservation Engine + Reservation Expirer + Confirmation Service.
 *
 * Architecture Layers: Repository (Layer 5), Use Case (Layer 3)
 */

pub mod dto;
pub mod repository;
pub mod service;
pub mod confirmation;
pub mod expirer;
pub mod handler;

pub use dto::{Order, OrderItem, OrderStatus};
pub use repository::OrderRepository;
pub use service::ReservationEngine;
