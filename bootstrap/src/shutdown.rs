//! Graceful Shutdown
//!
//! 后台任务（Kafka 消费者、定时任务、指标采集）共享同一个取消令牌

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Shutdown 控制器
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 供后台任务监听的令牌
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 启动受跟踪的后台任务
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        info!("Triggering shutdown");
        self.token.cancel();
    }

    /// 触发关闭并等待后台任务结束，超时后放弃等待
    pub async fn shutdown_and_wait(&self, timeout: std::time::Duration) {
        self.shutdown();
        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_err() {
            warn!(
                remaining = self.tracker.len(),
                "Background tasks did not stop in time"
            );
        }
    }

    /// 等待关闭信号
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_background_task_stops_on_shutdown() {
        let controller = ShutdownController::new();
        let stopped = Arc::new(AtomicBool::new(false));

        let token = controller.token();
        let flag = stopped.clone();
        controller.spawn(async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        controller.shutdown_and_wait(Duration::from_secs(1)).await;

        assert!(controller.is_shutdown());
        assert!(stopped.load(Ordering::SeqCst));
    }
}
