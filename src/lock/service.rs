use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

static DEGRADED_WARNED: AtomicBool = AtomicBool::new(false);

/// A short-lived named mutual-exclusion lease.
///
/// Backed by Redis when `redis_url` is configured: `SET key token NX EX ttl`
/// for acquire, a read-then-conditional-delete (fencing by token) for
/// release. Falls back to an always-succeeds local mode when no Redis is
/// configured, per the single-replica degraded-mode escalation.
#[derive(Clone)]
pub enum LockService {
    Redis(ConnectionManager),
    /// Lockless degraded mode. Only safe with a single replica; see
    /// `config::Config::allow_lockless_degraded_mode`.
    Degraded,
}

impl LockService {
    pub async fn connect(redis_url: &str) -> Option<Self> {
        if redis_url.is_empty() {
            return None;
        }
        let client = redis::Client::open(redis_url).ok()?;
        let manager = client.get_connection_manager().await.ok()?;
        Some(LockService::Redis(manager))
    }

    pub fn degraded() -> Self {
        if !DEGRADED_WARNED.swap(true, Ordering::SeqCst) {
            tracing::error!(
                "lock service running in lockless degraded mode — safe only with a single replica"
            );
        }
        LockService::Degraded
    }

    /// Acquire a lease on `key` for `ttl`. Returns an owned `Lease` guard on
    /// success, or `None` if the key is currently held by someone else.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> crate::error::Result<Option<Lease>> {
        match self {
            LockService::Degraded => Ok(Some(Lease {
                key: key.to_string(),
                token: String::new(),
                backend: self.clone(),
            })),
            LockService::Redis(conn) => {
                let mut conn = conn.clone();
                let token = Uuid::new_v4().to_string();
                let redis_key = lock_key(key);
                let ok: bool = redis::pipe()
                    .atomic()
                    .cmd("SET")
                    .arg(&redis_key)
                    .arg(&token)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl.as_secs().max(1))
                    .query_async(&mut conn)
                    .await
                    .map(|v: redis::Value| !matches!(v, redis::Value::Nil))
                    .map_err(|e| crate::error::AppError::Internal(format!("redis error: {e}")))?;
                if ok {
                    Ok(Some(Lease {
                        key: key.to_string(),
                        token,
                        backend: self.clone(),
                    }))
                } else {
                    Ok(None)
                }
            }
        }
    }

    async fn release(&self, key: &str, token: &str) {
        if let LockService::Redis(conn) = self {
            let mut conn = conn.clone();
            let redis_key = lock_key(key);
            let held: Option<String> = conn.get(&redis_key).await.ok().flatten();
            if held.as_deref() == Some(token) {
                let _: Result<(), _> = conn.del(&redis_key).await;
            }
        }
    }
}

fn lock_key(key: &str) -> String {
    format!("lock:{key}")
}

/// RAII guard for an acquired lease. Release is best-effort: if it fails,
/// the lease simply expires at its ttl.
pub struct Lease {
    key: String,
    token: String,
    backend: LockService,
}

impl Lease {
    pub async fn release(self) {
        self.backend.release(&self.key, &self.token).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_namespaced() {
        assert_eq!(lock_key("tier:abc"), "lock:tier:abc");
    }

    #[tokio::test]
    async fn degraded_mode_always_grants_a_lease() {
        let svc = LockService::degraded();
        let lease = svc.acquire("tier:abc", Duration::from_secs(5)).await.unwrap();
        assert!(lease.is_some());
    }
}
