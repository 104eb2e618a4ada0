/**
 * INFRASTRUCTURE LAYER - Configuration
 *
 * Config: The settings manager - where environment variables become useful data
 *
 * Architecture Layer: Infrastructure (Layer 6)
 * Dependencies: Environment variables
 * Responsibility: Load, parse, and provide configuration to the application
 *
 * Why a Config struct? Because scattered env::var() calls are a maintenance nightmare.
 * Centralize configuration - change once, affect everywhere.
 */

use std::env;
use std::time::Duration;

/**
 * Config: All the settings the ticketing core needs to run
 *
 * Loaded once at startup, cloned and passed to services.
 * Clone is cheap because strings are reference-counted or small.
 */
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,

    /// Shared secret compared constant-time against the webhook token header.
    pub webhook_secret: String,
    /// Alternative verification mode: HMAC-SHA256 over the raw webhook body.
    pub webhook_hmac_secret: String,

    /// Default reservation hold duration before the Expirer reclaims inventory.
    pub reservation_ttl: Duration,
    /// TTL for a tier-scoped lock lease acquired during reservation.
    pub lock_ttl: Duration,
    /// TTL for an order-scoped lock lease acquired by the Expirer.
    pub order_lock_ttl: Duration,
    /// How long an externally created invoice remains payable.
    pub invoice_expiry: Duration,
    /// How often the Reservation Expirer sweeps for expired holds.
    pub expirer_interval: Duration,
    /// Max number of expired orders reclaimed per Expirer sweep.
    pub expirer_batch_size: i64,

    /// Platform fee rate applied to an order's subtotal (e.g. 0.05 = 5%).
    pub platform_fee_rate: rust_decimal::Decimal,
    /// Fixed per-order service fee, in the smallest currency unit.
    pub service_fee: rust_decimal::Decimal,

    /// Base URL the Payment Orchestrator calls to create invoices.
    pub payment_provider_url: String,
    pub payment_provider_api_key: String,

    /// Base URL the Notification Dispatch client posts to.
    pub notification_service_url: String,

    /// Allows startup without a reachable Lock Service when true. See REDESIGN FLAGS.
    pub allow_lockless_degraded_mode: bool,
}

impl Config {
    /**
     * Load configuration from environment variables.
     *
     * Reads from .env file (via dotenvy) or system environment.
     * Provides sensible defaults where possible; secrets default to empty
     * strings so the app can still boot (and fail loudly on first use)
     * rather than refuse to start in local/dev environments.
     */
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .unwrap_or(8081),

            database_url: env::var("DATABASE_URL").unwrap_or_default(),
            redis_url: env::var("REDIS_URL").unwrap_or_default(),

            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),
            webhook_hmac_secret: env::var("WEBHOOK_HMAC_SECRET").unwrap_or_default(),

            reservation_ttl: Duration::from_secs(parse_env_u64("RESERVATION_TTL_SECS", 900)),
            lock_ttl: Duration::from_secs(parse_env_u64("LOCK_TTL_SECS", 10)),
            order_lock_ttl: Duration::from_secs(parse_env_u64("ORDER_LOCK_TTL_SECS", 10)),
            invoice_expiry: Duration::from_secs(parse_env_u64("INVOICE_EXPIRY_SECS", 1800)),
            expirer_interval: Duration::from_secs(parse_env_u64("EXPIRER_INTERVAL_SECS", 60)),
            expirer_batch_size: parse_env_u64("EXPIRER_BATCH_SIZE", 100) as i64,

            platform_fee_rate: env::var("PLATFORM_FEE_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| "0.05".parse().unwrap()),
            service_fee: env::var("SERVICE_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| "2500".parse().unwrap()),

            payment_provider_url: env::var("PAYMENT_PROVIDER_URL").unwrap_or_default(),
            payment_provider_api_key: env::var("PAYMENT_PROVIDER_API_KEY").unwrap_or_default(),

            notification_service_url: env::var("NOTIFICATION_SERVICE_URL").unwrap_or_default(),

            allow_lockless_degraded_mode: env::var("ALLOW_LOCKLESS_DEGRADED_MODE")
                .map(|v| v == "true")
                .unwrap_or(false),
        }
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_u64_falls_back_on_missing() {
        assert_eq!(parse_env_u64("TICKETING_CORE_DOES_NOT_EXIST", 42), 42);
    }

    #[test]
    fn default_fee_rate_is_five_percent() {
        let cfg = Config {
            port: 0,
            database_url: String::new(),
            redis_url: String::new(),
            webhook_secret: String::new(),
            webhook_hmac_secret: String::new(),
            reservation_ttl: Duration::from_secs(900),
            lock_ttl: Duration::from_secs(10),
            order_lock_ttl: Duration::from_secs(10),
            invoice_expiry: Duration::from_secs(1800),
            expirer_interval: Duration::from_secs(60),
            expirer_batch_size: 100,
            platform_fee_rate: "0.05".parse().unwrap(),
            service_fee: "2500".parse().unwrap(),
            payment_provider_url: String::new(),
            payment_provider_api_key: String::new(),
            notification_service_url: String::new(),
            allow_lockless_degraded_mode: false,
        };
        assert_eq!(cfg.platform_fee_rate.to_string(), "0.05");
    }
}
