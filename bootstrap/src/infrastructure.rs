//! 基础设施资源
//!
//! 启动时按配置创建连接，连接失败按退避重试

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use commercium_adapter_kafka::{KafkaEventPublisher, KafkaProducerConfig};
use commercium_adapter_postgres::{PoolStatus, PostgresConfig, create_pool, pool_status};
use commercium_adapter_redis::{RedisDistributedLock, create_connection_manager};
use commercium_auth_core::TokenService;
use commercium_common::{
    RetryConfig, is_retryable_error, with_conditional_retry, with_retry, with_retry_optional,
};
use commercium_config::AppConfig;
use commercium_errors::AppResult;
use commercium_ports::{DistributedLock, EventPublisher, OutboundMessage};
use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{info, warn};

/// 基础设施资源，clone 代价低
#[derive(Clone)]
pub struct Infrastructure {
    config: Arc<AppConfig>,
    postgres_pool: PgPool,
    redis_conn: ConnectionManager,
    token_service: Arc<TokenService>,
    kafka_publisher: Option<Arc<KafkaEventPublisher>>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry = RetryConfig::new(5, Duration::from_millis(500), Duration::from_secs(10));

        let pg_config = PostgresConfig::new(config.database.url.expose_secret().clone())
            .with_max_connections(config.database.max_connections);
        // 认证失败、库不存在等永久错误不重试
        let postgres_pool = with_conditional_retry(
            &retry,
            "postgres_connect",
            || create_pool(&pg_config),
            |e| is_retryable_error(&e.to_string()),
        )
        .await?;
        info!("PostgreSQL connected");

        let redis_url = config.redis.url.expose_secret().clone();
        let redis_conn =
            with_retry(&retry, "redis_connect", || create_connection_manager(&redis_url)).await?;
        info!("Redis connected");

        let token_service = Arc::new(TokenService::new(
            config.jwt.secret.expose_secret(),
            config.jwt.expires_in,
            config.jwt.refresh_expires_in,
            &config.jwt.issuer,
            &config.jwt.audience,
        ));

        let kafka_publisher = match &config.kafka {
            Some(kafka) => {
                let producer_config = KafkaProducerConfig::new(&kafka.brokers)
                    .with_client_id(&kafka.client_id);
                let publisher = with_retry_optional(&retry, "kafka_producer", || async {
                    KafkaEventPublisher::new(&producer_config)
                })
                .await;
                if publisher.is_some() {
                    info!(brokers = %kafka.brokers, "Kafka producer created");
                }
                publisher.map(Arc::new)
            }
            None => {
                warn!("Kafka is not configured, events will only be logged");
                None
            }
        };

        Ok(Self {
            config: Arc::new(config),
            postgres_pool,
            redis_conn,
            token_service,
            kafka_publisher,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }

    pub fn token_service(&self) -> Arc<TokenService> {
        self.token_service.clone()
    }

    /// 事件发布器；Kafka 不可用时退化为日志输出
    pub fn event_publisher(&self) -> Arc<dyn EventPublisher> {
        match &self.kafka_publisher {
            Some(publisher) => publisher.clone() as Arc<dyn EventPublisher>,
            None => Arc::new(LoggingEventPublisher),
        }
    }

    /// 基于 Redis 的分布式锁
    pub fn distributed_lock(&self) -> Arc<dyn DistributedLock> {
        Arc::new(RedisDistributedLock::new(self.redis_conn.clone()))
    }

    pub fn postgres_pool_status(&self) -> PoolStatus {
        pool_status(&self.postgres_pool)
    }

    pub async fn check_postgres(&self) -> AppResult<()> {
        commercium_adapter_postgres::check_connection(&self.postgres_pool).await
    }

    pub async fn check_redis(&self) -> AppResult<()> {
        commercium_adapter_redis::check_connection(&self.redis_conn).await
    }

    /// 关闭前刷新 Kafka 并关闭连接池
    pub async fn close(&self) {
        if let Some(publisher) = &self.kafka_publisher {
            if let Err(e) = publisher.flush(Duration::from_secs(5)) {
                warn!(error = %e, "Failed to flush Kafka producer");
            }
        }
        self.postgres_pool.close().await;
        info!("Infrastructure closed");
    }
}

/// 仅写日志的事件发布器
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, message: &OutboundMessage) -> AppResult<()> {
        info!(
            topic = %message.topic,
            key = %message.key,
            payload = %message.payload,
            "Event published (logging only)"
        );
        Ok(())
    }
}
