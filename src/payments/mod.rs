/**
 * INFRASTRUCTURE LAYER - Module Exports
 *
 * Payments Module: invoice creation, webhook ingestion, and the payment
 * transaction store backing the Payment Orchestrator.
 *
 * Architecture Layer: Infrastructure (Layer 6)
 * Exports:
 * - handler: Controller layer (HTTP endpoints)
 * - service: Use case layer (business logic)
 * - repository: Data layer (Payment Store)
 * - dto: Payment Transaction / Webhook Event types
 */

pub mod dto;
pub mod handler;
pub mod repository;
pub mod service;

pub use repository::PaymentRepository;
pub use service::PaymentOrchestrator;
