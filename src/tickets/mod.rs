/**
 * Ticket Issuance + Ticket Store.
 *
 * Architecture Layers: Repository (Layer 5), Use Case (Layer 3), Controller (Layer 2)
 */

pub mod dto;
pub mod qr;
pub mod repository;
pub mod service;
pub mod handler;

pub use dto::{Ticket, TicketStatus};
pub use repository::TicketRepository;
pub use service::TicketIssuance;
