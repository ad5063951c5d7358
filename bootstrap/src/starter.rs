//! 服务启动器
//!
//! 提供统一的服务启动模式

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use commercium_config::{AppConfig, ConfigError};
use commercium_errors::AppError;
use commercium_telemetry::TelemetryError;
use thiserror::Error;
use tracing::{error, info};

use crate::health::{HealthChecker, HealthServer};
use crate::infrastructure::Infrastructure;
use crate::metrics::{MetricsRecorder, PoolMetricsCollector};
use crate::runtime::{init_runtime, shutdown_signal};
use crate::shutdown::ShutdownController;

/// 健康检查端口相对业务端口的偏移
pub const HEALTH_PORT_OFFSET: u16 = 1000;

const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(15);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// 启动失败原因
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("Infrastructure error: {0}")]
    Infrastructure(#[from] AppError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),
}

/// 运行 HTTP 服务
///
/// 1. 加载 `.env` 与配置
/// 2. 初始化日志与 Prometheus recorder
/// 3. 创建基础设施（带重试）
/// 4. 调用 `app_builder` 构建路由，后台任务通过 `ShutdownController` 启动
/// 5. 启动健康检查服务器（业务端口 + 1000）与连接池指标采集
/// 6. 收到信号后停止接收请求，取消后台任务，刷新 Kafka 并关闭连接池
///
/// ```ignore
/// commercium_bootstrap::run("config", |infra, shutdown| async move {
///     let state = AppState::build(&infra, &shutdown).await?;
///     Ok(router(state))
/// })
/// .await?;
/// ```
pub async fn run<F, Fut>(config_dir: &str, app_builder: F) -> Result<(), BootstrapError>
where
    F: FnOnce(Infrastructure, ShutdownController) -> Fut,
    Fut: Future<Output = Result<Router, AppError>>,
{
    let _ = dotenvy::dotenv();

    let config = AppConfig::load(config_dir)?;
    init_runtime(&config)?;

    info!(app_name = %config.app_name, "Starting service");

    let metrics = Arc::new(MetricsRecorder::install()?);
    let infra = Infrastructure::from_config(config.clone()).await?;
    let controller = ShutdownController::new();

    let router = app_builder(infra.clone(), controller.clone()).await?;

    let health_port = config.server.port.saturating_add(HEALTH_PORT_OFFSET);
    let health_server = HealthServer::new(HealthChecker::new(infra.clone()), metrics, health_port);
    let token = controller.token();
    controller.spawn(async move {
        if let Err(e) = health_server.serve(token).await {
            error!(error = %e, "Health server error");
        }
    });

    let collector = PoolMetricsCollector::new(infra.clone(), POOL_METRICS_INTERVAL);
    controller.spawn(collector.run(controller.token()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server starting");

    let signal_controller = controller.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {},
                _ = signal_controller.cancelled() => {},
            }
        })
        .await?;

    controller.shutdown_and_wait(SHUTDOWN_GRACE).await;
    infra.close().await;

    info!("Service stopped");
    Ok(())
}
