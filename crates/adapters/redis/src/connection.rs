//! Redis 连接管理

use commercium_errors::{AppError, AppResult};
use redis::Client;
use redis::aio::ConnectionManager;

/// 创建 Redis 连接管理器（自动重连）
pub async fn create_connection_manager(url: &str) -> AppResult<ConnectionManager> {
    let client = Client::open(url)
        .map_err(|e| AppError::internal(format!("Failed to create Redis client: {}", e)))?;

    ConnectionManager::new(client).await.map_err(|e| {
        AppError::internal(format!("Failed to create Redis connection manager: {}", e))
    })
}

/// PING 检查
pub async fn check_connection(conn: &ConnectionManager) -> AppResult<()> {
    let mut conn = conn.clone();
    redis::cmd("PING")
        .query_async::<String>(&mut conn)
        .await
        .map_err(|e| AppError::internal(format!("Redis health check failed: {}", e)))?;
    Ok(())
}
