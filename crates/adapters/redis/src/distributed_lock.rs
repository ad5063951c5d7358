//! Redis 分布式锁实现
//!
//! `SET key token NX PX lease` 获取，Lua 比对令牌后删除

use std::time::{Duration, Instant};

use async_trait::async_trait;
use commercium_errors::{AppError, AppResult};
use commercium_ports::{DistributedLock, LockToken};
use redis::Script;
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

const RELEASE_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
";

/// Redis 分布式锁
#[derive(Clone)]
pub struct RedisDistributedLock {
    conn: ConnectionManager,
    lock_prefix: String,
}

impl RedisDistributedLock {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            lock_prefix: "lock:".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lock_prefix = prefix.into();
        self
    }

    fn lock_key(&self, key: &str) -> String {
        format!("{}{}", self.lock_prefix, key)
    }
}

/// 指标用的资源名：只保留前两段（`stock:reserve:P-1` -> `stock:reserve`）
///
/// 业务 id 不进入指标标签
fn metric_resource(key: &str) -> &str {
    match key.match_indices(':').nth(1) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}

#[async_trait]
impl DistributedLock for RedisDistributedLock {
    async fn try_acquire(&self, key: &str, lease: Duration) -> AppResult<Option<LockToken>> {
        let mut conn = self.conn.clone();
        let lock_key = self.lock_key(key);
        let token = LockToken::generate();
        let started = Instant::now();

        let result: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(lease.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::internal(format!("Redis lock acquire failed: {}", e)))?;

        let acquired = result.is_some();
        commercium_telemetry::metrics::record_lock_acquire(
            metric_resource(key),
            acquired,
            started.elapsed().as_secs_f64() * 1000.0,
        );
        debug!(lock = %lock_key, acquired, "Lock attempt");

        Ok(acquired.then_some(token))
    }

    async fn release(&self, key: &str, token: &LockToken) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let lock_key = self.lock_key(key);

        let deleted: i64 = Script::new(RELEASE_SCRIPT)
            .key(&lock_key)
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::internal(format!("Redis lock release failed: {}", e)))?;

        if deleted == 0 {
            warn!(lock = %lock_key, "Lock expired or owned by another holder at release");
        }
        Ok(deleted > 0)
    }
}
