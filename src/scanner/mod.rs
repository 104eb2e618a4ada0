/**
 * Ticket Validator module: gate-scan QR validation.
 *
 * Exports:
 * - handler: Controller layer (HTTP endpoints)
 * - service: Use case layer (business logic)
 */

pub mod handler;
pub mod service;

pub use service::TicketValidator;
