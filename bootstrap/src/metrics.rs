//! Metrics 模块

use std::time::Duration;

use commercium_telemetry::TelemetryError;
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::Infrastructure;

/// Prometheus 记录器
pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// 安装全局 recorder，进程内只能调用一次
    pub fn install() -> Result<Self, TelemetryError> {
        let handle = commercium_telemetry::init_metrics()?;
        Ok(Self { handle })
    }

    /// Prometheus 文本格式
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// 连接池 Metrics 采集器
///
/// 定期采集 PostgreSQL 连接池与 Redis 连接状态
pub struct PoolMetricsCollector {
    infra: Infrastructure,
    interval: Duration,
}

impl PoolMetricsCollector {
    pub fn new(infra: Infrastructure, interval: Duration) -> Self {
        Self { infra, interval }
    }

    /// 采集一次
    pub async fn collect(&self) {
        let status = self.infra.postgres_pool_status();
        commercium_telemetry::metrics::set_pool_status("postgres", status.size, status.idle);

        let redis_connected = self.infra.check_redis().await.is_ok();
        gauge!("redis_connection_status").set(if redis_connected { 1.0 } else { 0.0 });

        debug!(
            postgres_size = status.size,
            postgres_idle = status.idle,
            redis_connected,
            "Pool metrics collected"
        );
    }

    /// 循环采集直到取消
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.collect().await,
            }
        }
    }
}
