/**
 * INFRASTRUCTURE LAYER - Database Connection
 *
 * Database Pool: The connection manager - because opening connections is expensive
 *
 * Architecture Layer: Infrastructure (Layer 6)
 * Dependencies: PostgreSQL (via SQLx)
 * Responsibility: Create and configure database connection pool
 */

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/**
 * Create a PostgreSQL connection pool.
 *
 * - max_connections: 20, min_connections: 5 — enough for moderate concurrent
 *   load without exhausting the database's own connection limit.
 */
pub async fn create_pool(database_url: &str) -> PgPool {
    if database_url.is_empty() {
        tracing::warn!("DATABASE_URL not set, database features unavailable");
        PgPoolOptions::new()
            .max_connections(1)
            .connect("postgres://localhost/nonexistent")
            .await
            .expect("this should not be called without a DATABASE_URL")
    } else {
        PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .connect(database_url)
            .await
            .expect("failed to connect to database")
    }
}
