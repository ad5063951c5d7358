//! 指标记录函数
//!
//! 未安装 recorder 时调用为空操作

use ::metrics::{counter, gauge, histogram};

/// HTTP 请求
pub fn record_http_request(method: &str, route: &str, status: u16, duration_ms: f64) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_ms", &labels).record(duration_ms);
}

/// 数据库查询
pub fn record_db_query(operation: &str, table: &str, duration_ms: f64, success: bool) {
    let labels = [
        ("operation", operation.to_string()),
        ("table", table.to_string()),
        ("success", success.to_string()),
    ];

    counter!("db_queries_total", &labels).increment(1);
    histogram!("db_query_duration_ms", &labels).record(duration_ms);
}

/// 分布式锁获取
///
/// `resource` 取锁的类别（如 `stock:reserve`），不含业务 id
pub fn record_lock_acquire(resource: &str, acquired: bool, wait_ms: f64) {
    let labels = [
        ("resource", resource.to_string()),
        ("acquired", acquired.to_string()),
    ];

    counter!("lock_acquire_total", &labels).increment(1);
    histogram!("lock_wait_duration_ms", &labels).record(wait_ms);
}

/// Kafka 消息收发
pub fn record_kafka_message(topic: &str, operation: &str, success: bool) {
    let labels = [
        ("topic", topic.to_string()),
        ("operation", operation.to_string()),
        ("success", success.to_string()),
    ];

    counter!("kafka_messages_total", &labels).increment(1);
}

/// 领域事件发布
pub fn record_event_publish(event_type: &str, success: bool, duration_ms: f64) {
    let labels = [
        ("event_type", event_type.to_string()),
        ("success", success.to_string()),
    ];

    counter!("event_publish_total", &labels).increment(1);
    histogram!("event_publish_duration_ms", &labels).record(duration_ms);
}

/// 业务事件（下单、支付完成、库存预留、结算完成等）
pub fn record_business_event(context: &str, event: &str) {
    let labels = [
        ("context", context.to_string()),
        ("event", event.to_string()),
    ];

    counter!("business_events_total", &labels).increment(1);
}

/// 连接池状态
pub fn set_pool_status(pool: &str, size: u32, idle: usize) {
    let labels = [("pool", pool.to_string())];
    gauge!("connection_pool_size", &labels).set(size as f64);
    gauge!("connection_pool_idle", &labels).set(idle as f64);
}

/// 定时任务执行
pub fn record_job_run(job: &str, success: bool, duration_ms: f64) {
    let labels = [("job", job.to_string()), ("success", success.to_string())];

    counter!("scheduled_job_runs_total", &labels).increment(1);
    histogram!("scheduled_job_duration_ms", &labels).record(duration_ms);
}

/// 按状态统计的待处理结算数
pub fn set_settlement_backlog(status: &str, count: i64) {
    let labels = [("status", status.to_string())];
    gauge!("settlement_backlog", &labels).set(count as f64);
}
