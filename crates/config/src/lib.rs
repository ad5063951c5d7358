//! commercium-config - 配置加载库
//!
//! 加载顺序：`default.toml` → `{APP_ENV}.toml` → `COMMERCIUM_` 前缀环境变量

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 启动时执行迁移
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// Kafka 配置
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// 消费者组前缀，实际组名为 `{prefix}{context}-group`
    #[serde(default)]
    pub consumer_group_prefix: String,
    /// 是否启动本服务的消费者
    #[serde(default = "default_true")]
    pub consumers_enabled: bool,
}

fn default_client_id() -> String {
    "commercium".to_string()
}

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default = "default_refresh_expires_in")]
    pub refresh_expires_in: i64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
}

fn default_expires_in() -> i64 {
    3600
}

fn default_refresh_expires_in() -> i64 {
    2_592_000
}

fn default_issuer() -> String {
    "commercium".to_string()
}

fn default_audience() -> String {
    "commercium-api".to_string()
}

/// 安全配置
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// 服务间调用令牌（`X-Internal-Token`）
    pub internal_token: Secret<String>,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// 支付网关配置
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_card_rate")]
    pub card_success_rate: f64,
    #[serde(default = "default_bank_rate")]
    pub bank_transfer_success_rate: f64,
    #[serde(default = "default_other_rate")]
    pub default_success_rate: f64,
}

fn default_provider() -> String {
    "MOCK_PG".to_string()
}

fn default_card_rate() -> f64 {
    0.9
}

fn default_bank_rate() -> f64 {
    0.95
}

fn default_other_rate() -> f64 {
    0.8
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            card_success_rate: default_card_rate(),
            bank_transfer_success_rate: default_bank_rate(),
            default_success_rate: default_other_rate(),
        }
    }
}

/// 结算配置
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    #[serde(default = "default_commission_rate")]
    pub default_commission_rate: Decimal,
    #[serde(default = "default_min_settlement_amount")]
    pub min_settlement_amount: Decimal,
    #[serde(default = "default_max_period_days")]
    pub max_period_days: i64,
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

fn default_commission_rate() -> Decimal {
    Decimal::new(3, 2)
}

fn default_min_settlement_amount() -> Decimal {
    Decimal::from(1000)
}

fn default_max_period_days() -> i64 {
    31
}

fn default_report_dir() -> String {
    "reports".to_string()
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            default_commission_rate: default_commission_rate(),
            min_settlement_amount: default_min_settlement_amount(),
            max_period_days: default_max_period_days(),
            report_dir: default_report_dir(),
        }
    }
}

/// 定时任务配置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// 库存配置
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_lock_wait_secs")]
    pub lock_wait_secs: u64,
    #[serde(default = "default_lock_lease_secs")]
    pub lock_lease_secs: u64,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
}

fn default_lock_wait_secs() -> u64 {
    10
}

fn default_lock_lease_secs() -> u64 {
    30
}

fn default_low_stock_threshold() -> i32 {
    10
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            lock_wait_secs: default_lock_wait_secs(),
            lock_lease_secs: default_lock_lease_secs(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_app_env() -> String {
    std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string())
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: Option<KafkaConfig>,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// 从配置目录与环境变量加载
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = default_app_env();

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("COMMERCIUM_").split("__"));

        Self::from_figment(figment)
    }

    /// 从任意 Figment 提取并校验
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.settlement.default_commission_rate;
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "settlement.default_commission_rate must be within [0, 1], got {}",
                rate
            )));
        }
        for (name, p) in [
            ("card_success_rate", self.payment.card_success_rate),
            ("bank_transfer_success_rate", self.payment.bank_transfer_success_rate),
            ("default_success_rate", self.payment.default_success_rate),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid(format!(
                    "payment.{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
