//! 健康检查模块
//!
//! 独立端口上提供 /health、/ready 和 /metrics

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::Infrastructure;
use crate::metrics::MetricsRecorder;

/// 组件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// 健康检查状态
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: Vec<ComponentHealth>,
}

/// 组件健康状态
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: HealthState::Healthy,
            checks: vec![],
        }
    }

    /// 任一组件不健康则整体不健康
    pub fn add_check(&mut self, check: ComponentHealth) {
        if check.status != HealthState::Healthy {
            self.status = HealthState::Unhealthy;
        }
        self.checks.push(check);
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthState::Healthy,
            message: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthState::Unhealthy,
            message: Some(message.into()),
        }
    }
}

/// 健康检查器
#[derive(Clone)]
pub struct HealthChecker {
    infra: Infrastructure,
}

impl HealthChecker {
    pub fn new(infra: Infrastructure) -> Self {
        Self { infra }
    }

    /// 存活检查，不检查依赖
    pub async fn liveness(&self) -> HealthStatus {
        HealthStatus::healthy()
    }

    /// 就绪检查：PostgreSQL 与 Redis
    pub async fn readiness(&self) -> HealthStatus {
        let mut status = HealthStatus::healthy();

        status.add_check(match self.infra.check_postgres().await {
            Ok(()) => ComponentHealth::healthy("postgres"),
            Err(e) => ComponentHealth::unhealthy("postgres", e.to_string()),
        });

        status.add_check(match self.infra.check_redis().await {
            Ok(()) => ComponentHealth::healthy("redis"),
            Err(e) => ComponentHealth::unhealthy("redis", e.to_string()),
        });

        status
    }
}

#[derive(Clone)]
struct HealthServerState {
    checker: HealthChecker,
    metrics: Arc<MetricsRecorder>,
}

/// 健康检查 HTTP 服务器
pub struct HealthServer {
    state: HealthServerState,
    port: u16,
}

impl HealthServer {
    pub fn new(checker: HealthChecker, metrics: Arc<MetricsRecorder>, port: u16) -> Self {
        Self {
            state: HealthServerState { checker, metrics },
            port,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
    }

    /// 运行到取消为止
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let app = self.router();

        info!(%addr, "Health server starting");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}

async fn health_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    Json(state.checker.liveness().await)
}

async fn ready_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let status = state.checker.readiness().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

async fn metrics_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    state.metrics.render()
}
