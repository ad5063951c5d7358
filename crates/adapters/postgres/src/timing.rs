//! 查询耗时指标

use std::future::Future;
use std::time::Instant;

use commercium_errors::AppResult;

/// 执行查询并记录耗时与成败
pub async fn timed<T, F>(operation: &str, table: &str, query: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let started = Instant::now();
    let result = query.await;
    commercium_telemetry::metrics::record_db_query(
        operation,
        table,
        started.elapsed().as_secs_f64() * 1000.0,
        result.is_ok(),
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use commercium_errors::AppError;

    #[tokio::test]
    async fn test_timed_passes_result_through() {
        let ok = timed("select", "orders", async { Ok::<_, AppError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = timed("insert", "orders", async {
            Err::<(), _>(AppError::database("boom"))
        })
        .await;
        assert!(err.is_err());
    }
}
