use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::Config;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Clone)]
enum Backend {
    Redis(ConnectionManager),
    /// Process-local map with expiry, used alongside the in-memory store.
    Local(Arc<Mutex<HashMap<String, (String, Option<Instant>)>>>),
}

/// Best-effort key-value access. Every failure or timeout is logged and
/// reported as a miss; nothing here can fail a request. When Redis is
/// unreachable at startup the cache runs disabled.
#[derive(Clone)]
pub struct Cache {
    backend: Option<Backend>,
    prefix: String,
    op_timeout: Duration,
}

impl Cache {
    pub async fn connect(config: &Config) -> Self {
        let prefix = config.redis.key_prefix.clone();
        let op_timeout = Duration::from_millis(config.redis.op_timeout_ms);
        let disabled = |prefix: String| Self {
            backend: None,
            prefix,
            op_timeout,
        };
        let client = match Client::open(config.redis_url()) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Invalid Redis URL, cache disabled: {e}");
                return disabled(prefix);
            }
        };

        match tokio::time::timeout(Duration::from_secs(5), ConnectionManager::new(client)).await {
            Ok(Ok(conn)) => Self {
                backend: Some(Backend::Redis(conn)),
                prefix,
                op_timeout,
            },
            Ok(Err(e)) => {
                tracing::warn!("Redis unavailable, cache disabled: {e}");
                disabled(prefix)
            }
            Err(_) => {
                tracing::warn!("Redis connection timed out, cache disabled");
                disabled(prefix)
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            backend: None,
            prefix: String::new(),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn local() -> Self {
        Self {
            backend: Some(Backend::Local(Arc::default())),
            prefix: String::new(),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    fn key(&self, k: &str) -> String {
        format!("{}{}", self.prefix, k)
    }

    async fn bounded<T>(
        &self,
        op: &str,
        key: &str,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!("Cache {op} {key} failed: {e}");
                None
            }
            Err(_) => {
                tracing::warn!("Cache {op} {key} timed out");
                None
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let k = self.key(key);
        match self.backend.clone()? {
            Backend::Redis(mut conn) => self
                .bounded("GET", key, conn.get::<_, Option<String>>(&k))
                .await
                .flatten(),
            Backend::Local(map) => {
                let mut map = map.lock().await;
                let expired =
                    matches!(map.get(&k), Some((_, Some(at))) if *at <= Instant::now());
                if expired {
                    map.remove(&k);
                    return None;
                }
                map.get(&k).map(|(value, _)| value.clone())
            }
        }
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .await
            .and_then(|s| serde_json::from_str(&s).ok())
    }

    /// `SET key value [EX ttl]`, overwriting whatever is there.
    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let k = self.key(key);
        match self.backend.clone() {
            None => {}
            Some(Backend::Redis(mut conn)) => {
                if ttl_secs > 0 {
                    self.bounded("SET", key, conn.set_ex::<_, _, ()>(&k, value, ttl_secs))
                        .await;
                } else {
                    self.bounded("SET", key, conn.set::<_, _, ()>(&k, value))
                        .await;
                }
            }
            Some(Backend::Local(map)) => {
                map.lock()
                    .await
                    .insert(k, (value.to_string(), expiry(ttl_secs)));
            }
        }
    }

    /// `SET key value NX [EX ttl]`. Returns whether the value was written;
    /// an existing entry is never replaced.
    pub async fn set_nx(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let k = self.key(key);
        match self.backend.clone() {
            None => false,
            Some(Backend::Redis(mut conn)) => {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&k).arg(value).arg("NX");
                if ttl_secs > 0 {
                    cmd.arg("EX").arg(ttl_secs);
                }
                self.bounded(
                    "SET NX",
                    key,
                    cmd.query_async::<_, Option<String>>(&mut conn),
                )
                .await
                .flatten()
                .is_some()
            }
            Some(Backend::Local(map)) => {
                let mut map = map.lock().await;
                let live = matches!(
                    map.get(&k),
                    Some((_, expires)) if expires.map_or(true, |at| at > Instant::now())
                );
                if live {
                    return false;
                }
                map.insert(k, (value.to_string(), expiry(ttl_secs)));
                true
            }
        }
    }

    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        if let Ok(json) = serde_json::to_string(value) {
            self.set(key, &json, ttl_secs).await;
        }
    }

    pub async fn del(&self, key: &str) {
        let k = self.key(key);
        match self.backend.clone() {
            None => {}
            Some(Backend::Redis(mut conn)) => {
                self.bounded("DEL", key, conn.del::<_, ()>(&k)).await;
            }
            Some(Backend::Local(map)) => {
                map.lock().await.remove(&k);
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        match self.backend.clone() {
            None => false,
            Some(Backend::Redis(mut conn)) => self
                .bounded(
                    "PING",
                    "",
                    redis::cmd("PING").query_async::<_, String>(&mut conn),
                )
                .await
                .is_some(),
            Some(Backend::Local(_)) => true,
        }
    }
}

fn expiry(ttl_secs: u64) -> Option<Instant> {
    (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_nx_keeps_the_existing_value() {
        let cache = Cache::local();
        assert!(cache.set_nx("k", "first", 60).await);
        assert!(!cache.set_nx("k", "second", 60).await);
        assert_eq!(cache.get("k").await.as_deref(), Some("first"));

        cache.set("k", "third", 60).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("third"));

        cache.del("k").await;
        assert!(cache.get("k").await.is_none());
        assert!(cache.set_nx("k", "fourth", 60).await);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = Cache::local();
        cache.set("k", "v", 1).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.get("k").await.is_none());
        assert!(cache.set_nx("k", "again", 1).await);
    }

    #[tokio::test]
    async fn disabled_cache_is_inert() {
        let cache = Cache::disabled();
        assert!(!cache.is_enabled());
        assert!(!cache.set_nx("k", "v", 60).await);
        cache.set("k", "v", 60).await;
        assert!(cache.get("k").await.is_none());
        assert!(!cache.health_check().await);
    }
}
