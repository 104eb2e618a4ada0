/**
 * INFRASTRUCTURE LAYER - Distributed Lock Service
 *
 * Lock Service: short-lived named mutual-exclusion leases, backed by Redis.
 *
 * Architecture Layer: Infrastructure (Layer 6)
 * Dependencies: Redis (via redis-rs connection manager)
 * Responsibility: coordinate concurrent reservation/expiry attempts across
 * replicas. The database row lock remains the true overselling defense
 * (see inventory::store); this service only reduces wasted contention and
 * lets the Reservation Engine fail fast under a thundering herd.
 */

pub mod service;

pub use service::LockService;
