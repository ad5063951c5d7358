//! 数据库迁移
//!
//! SQL 文件由服务端 `sqlx::migrate!` 编译期嵌入，这里只负责执行与日志

use std::time::Instant;

use commercium_errors::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

/// 执行未应用的迁移
pub async fn run_migrations(pool: &PgPool, migrator: &Migrator) -> AppResult<()> {
    let started = Instant::now();
    let total = migrator.iter().count();

    migrator
        .run(pool)
        .await
        .map_err(|e| AppError::database(format!("Migration failed: {}", e)))?;

    info!(
        migrations = total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Database migrations applied"
    );
    Ok(())
}
