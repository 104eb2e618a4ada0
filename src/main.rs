/**
 * INFRASTRUCTURE LAYER - Application Entry Point
 *
 * Main: The conductor - orchestrating all services and routes
 *
 * Architecture Layer: Infrastructure (Layer 6)
 * Responsibility: Application bootstrap, dependency injection, routing
 *
 * Startup Flow:
 * 1. Initialize logging (tracing)
 * 2. Load configuration from environment
 * 3. Create database connection pool
 * 4. Connect the Lock Service (Redis), or fall back to degraded mode
 * 5. Initialize repositories and services with their dependencies
 * 6. Spawn the Reservation Expirer background sweep
 * 7. Build router with all endpoints
 * 8. Start HTTP server
 *
 * Architecture Pattern: Dependency Injection
 * - Repositories depend on database pool
 * - Services depend on repositories (and, for the Reservation Engine and
 *   Expirer, on the Lock Service)
 * - Handlers depend on services
 * - Router composes all handlers
 *
 * Modules:
 * - config: Configuration management
 * - db: Database connection pooling
 * - error: Error handling
 * - lock: Distributed Lock Service
 * - inventory: Ticket Tier inventory counters
 * - orders: Reservation Engine, Order Store, Confirmation Service, Expirer
 * - tickets: Ticket Issuance and Ticket Store
 * - payments: Payment Orchestrator and webhook ingestion
 * - notifications: Notification Dispatch client
 * - scanner: Ticket Validator (gate scanning)
 */

mod config;
mod db;
mod error;
mod inventory;
mod lock;
mod notifications;
mod orders;
mod payments;
mod scanner;
mod tickets;

use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use lock::LockService;
use notifications::HttpNotificationDispatcher;
use orders::confirmation::ConfirmationService;
use orders::expirer::ReservationExpirer;
use orders::service::ReservationEngine;
use payments::handler::InvoiceLookupState;
use payments::service::PaymentOrchestrator;
use scanner::TicketValidator;
use tickets::service::TicketIssuance;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticketing_core=info,tower_http=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let cfg = config::Config::from_env();

    let pool = if cfg.database_url.is_empty() {
        tracing::warn!("DATABASE_URL not set — running without database");
        None
    } else {
        Some(db::create_pool(&cfg.database_url).await)
    };

    let addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!("ticketing-core starting on {}", addr);

    let app = if let Some(pool) = pool {
        build_router(pool, cfg).await
    } else {
        Router::new()
            .route("/health", get(health))
            .layer(CorsLayer::permissive())
    };

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/**
 * Build Application Router
 *
 * Dependency injection and route composition.
 *
 * Flow:
 * 1. Connect the Lock Service, refusing to start in lockless degraded mode
 *    without an explicit opt-in (see REDESIGN FLAGS in SPEC_FULL.md)
 * 2. Create repositories (data access layer)
 * 3. Create services (business logic layer), wiring the Reservation Engine,
 *    Confirmation Service, Payment Orchestrator and Ticket Validator
 * 4. Spawn the Reservation Expirer background task
 * 5. Create route groups with handlers
 * 6. Compose all routes into the main router, with CORS and request tracing
 */
async fn build_router(pool: sqlx::PgPool, cfg: config::Config) -> Router {
    let lock = match LockService::connect(&cfg.redis_url).await {
        Some(lock) => lock,
        None => {
            if !cfg.allow_lockless_degraded_mode {
                panic!(
                    "lock service unreachable and ALLOW_LOCKLESS_DEGRADED_MODE is not set; \
                     refusing to start with more than one replica able to race on inventory"
                );
            }
            LockService::degraded()
        }
    };

    // REPOSITORY LAYER
    let inventory = inventory::InventoryStore::new(pool.clone());
    let order_repo = orders::repository::OrderRepository::new(pool.clone());
    let ticket_repo = tickets::repository::TicketRepository::new(pool.clone());
    let payment_repo = payments::repository::PaymentRepository::new(pool.clone());

    // USE CASE LAYER
    let reservation_engine = Arc::new(ReservationEngine::new(
        order_repo.clone(),
        inventory.clone(),
        lock.clone(),
        cfg.reservation_ttl,
        cfg.lock_ttl,
        cfg.platform_fee_rate,
        cfg.service_fee,
    ));

    let notifier: Arc<dyn notifications::NotificationDispatcher> =
        Arc::new(HttpNotificationDispatcher::new(cfg.notification_service_url.clone()));

    let issuance = TicketIssuance::new(ticket_repo.clone(), order_repo.clone());
    let confirmation = Arc::new(ConfirmationService::new(order_repo.clone(), issuance, notifier));

    let payment_orchestrator = Arc::new(PaymentOrchestrator::new(
        payment_repo.clone(),
        order_repo.clone(),
        confirmation.clone(),
        cfg.payment_provider_url.clone(),
        cfg.payment_provider_api_key.clone(),
        cfg.webhook_secret.clone(),
        cfg.webhook_hmac_secret.clone(),
        cfg.invoice_expiry,
    ));

    let ticket_validator = Arc::new(TicketValidator::new(ticket_repo.clone()));

    let invoice_lookup = Arc::new(InvoiceLookupState {
        payments: payment_repo.clone(),
        orders: order_repo.clone(),
    });

    // Background sweep: reclaims inventory for reservations past their deadline.
    ReservationExpirer::new(order_repo.clone(), inventory.clone(), lock.clone(), cfg.expirer_batch_size)
        .spawn(cfg.expirer_interval);

    // CONTROLLER LAYER: one router per handler dependency, merged below. Each
    // `with_state` call fixes that router's state, so a distinct dependency
    // needs its own `Router::new()`.
    let reservation_routes = Router::new()
        .route("/orders", post(orders::handler::create_order).get(orders::handler::list_orders))
        .with_state(reservation_engine);

    let order_repo_routes = Router::new()
        .route("/orders/{order_id}", get(orders::handler::get_order))
        .route("/orders/{order_id}/cancel", post(orders::handler::cancel_order))
        .with_state(Arc::new(order_repo.clone()));

    let confirmation_routes = Router::new()
        .route("/internal/orders/{order_id}/confirm", post(orders::handler::confirm_order))
        .with_state(confirmation);

    let ticket_routes = Router::new()
        .route("/tickets", get(tickets::handler::list_my_tickets))
        .route("/tickets/{ticket_id}", get(tickets::handler::get_ticket))
        .with_state(Arc::new(ticket_repo));

    let scanner_routes = Router::new()
        .route("/public/tickets/validate", post(scanner::handler::validate_ticket))
        .with_state(ticket_validator);

    let invoice_routes = Router::new()
        .route("/payments/invoices", post(payments::handler::create_invoice))
        .with_state(payment_orchestrator.clone());

    let invoice_lookup_routes = Router::new()
        .route("/payments/invoices/{order_id}", get(payments::handler::get_invoice))
        .with_state(invoice_lookup);

    let webhook_routes = Router::new()
        .route("/webhooks/payments", post(payments::handler::webhook))
        .with_state(payment_orchestrator);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(reservation_routes)
        .merge(order_repo_routes)
        .merge(confirmation_routes)
        .merge(ticket_routes)
        .merge(scanner_routes)
        .merge(invoice_routes)
        .merge(invoice_lookup_routes)
        .merge(webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "service": "ticketing-core"
    }))
}
