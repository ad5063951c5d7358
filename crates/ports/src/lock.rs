//! 分布式锁 trait 定义

use std::time::{Duration, Instant};

use async_trait::async_trait;
use commercium_errors::AppResult;

/// 获取轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 锁持有者令牌，释放时用于比对所有权
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 分布式锁
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// 尝试一次获取，成功返回令牌
    async fn try_acquire(&self, key: &str, lease: Duration) -> AppResult<Option<LockToken>>;

    /// 仅当令牌仍持有该锁时删除，返回是否实际释放
    async fn release(&self, key: &str, token: &LockToken) -> AppResult<bool>;

    /// 在 `wait` 内轮询获取
    async fn acquire_with_wait(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> AppResult<Option<LockToken>> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(token) = self.try_acquire(key, lease).await? {
                return Ok(Some(token));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct LocalLock {
        held: Mutex<HashMap<String, LockToken>>,
    }

    #[async_trait]
    impl DistributedLock for LocalLock {
        async fn try_acquire(&self, key: &str, _lease: Duration) -> AppResult<Option<LockToken>> {
            let mut held = self.held.lock().unwrap();
            if held.contains_key(key) {
                return Ok(None);
            }
            let token = LockToken::generate();
            held.insert(key.to_string(), token.clone());
            Ok(Some(token))
        }

        async fn release(&self, key: &str, token: &LockToken) -> AppResult<bool> {
            let mut held = self.held.lock().unwrap();
            if held.get(key) == Some(token) {
                held.remove(key);
                return Ok(true);
            }
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_wait_times_out_while_held() {
        let lock = LocalLock::default();
        let _token = lock
            .try_acquire("stock:reserve:p-1", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();

        let second = lock
            .acquire_with_wait("stock:reserve:p-1", Duration::from_millis(150), Duration::from_secs(30))
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_release_requires_matching_token() {
        let lock = LocalLock::default();
        let token = lock
            .try_acquire("k", Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        assert!(!lock.release("k", &LockToken::generate()).await.unwrap());
        assert!(lock.release("k", &token).await.unwrap());
        assert!(lock.try_acquire("k", Duration::from_secs(1)).await.unwrap().is_some());
    }
}
