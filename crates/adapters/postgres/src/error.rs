//! sqlx 错误映射

use commercium_errors::AppError;

/// PostgreSQL 唯一约束冲突
const UNIQUE_VIOLATION: &str = "23505";

/// 将 sqlx 错误映射为应用错误
pub fn map_sqlx_error(context: &str, err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::RowNotFound => AppError::not_found(format!("{}: row not found", context)),
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            AppError::conflict(format!("{}: duplicate record", context))
        }
        _ => AppError::database(format!("{}: {}", context, err)),
    }
}
