use super::*;
use figment::providers::{Format, Toml};
use secrecy::ExposeSecret;

const MINIMAL: &str = r#"
app_name = "commercium"
app_env = "test"

[server]
port = 9090

[database]
url = "postgres://commercium:pw@localhost:5432/commercium"

[redis]
url = "redis://localhost:6379/0"

[jwt]
secret = "super-secret-signing-key"

[security]
internal_token = "internal-token"
"#;

fn load(extra: &str) -> Result<AppConfig, ConfigError> {
    AppConfig::from_figment(
        Figment::new()
            .merge(Toml::string(MINIMAL))
            .merge(Toml::string(extra)),
    )
}

#[test]
fn test_defaults_applied() {
    let config = load("").unwrap();
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.jwt.expires_in, 3600);
    assert_eq!(config.jwt.refresh_expires_in, 2_592_000);
    assert_eq!(config.payment.provider, "MOCK_PG");
    assert_eq!(config.settlement.default_commission_rate, Decimal::new(3, 2));
    assert_eq!(config.settlement.max_period_days, 31);
    assert_eq!(config.inventory.lock_wait_secs, 10);
    assert!(config.scheduler.enabled);
    assert!(config.kafka.is_none());
}

#[test]
fn test_payment_success_rates_override() {
    let config = load("").unwrap();
    assert_eq!(config.payment.card_success_rate, 0.9);
    assert_eq!(config.payment.bank_transfer_success_rate, 0.95);
    assert_eq!(config.payment.default_success_rate, 0.8);

    let config = load(
        "[payment]\ncard_success_rate = 1.0\nbank_transfer_success_rate = 0.5\ndefault_success_rate = 0.0\n",
    )
    .unwrap();
    assert_eq!(config.payment.card_success_rate, 1.0);
    assert_eq!(config.payment.bank_transfer_success_rate, 0.5);
    assert_eq!(config.payment.default_success_rate, 0.0);

    let err = load("[payment]\ncard_success_rate = 1.5\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_secrets_redacted_in_debug() {
    let config = load("").unwrap();
    let debug = format!("{:?}", config);
    assert!(!debug.contains("super-secret-signing-key"));
    assert!(!debug.contains("internal-token"));
    assert!(debug.contains("Secret([REDACTED"));
    assert_eq!(config.jwt.secret.expose_secret(), "super-secret-signing-key");
}

#[test]
fn test_commission_rate_out_of_range_rejected() {
    let err = load("[settlement]\ndefault_commission_rate = 1.5\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_kafka_section_optional() {
    let config = load("[kafka]\nbrokers = \"localhost:9092\"\n").unwrap();
    let kafka = config.kafka.unwrap();
    assert_eq!(kafka.client_id, "commercium");
    assert!(kafka.consumers_enabled);
}

#[test]
fn test_missing_required_section_fails() {
    let result = AppConfig::from_figment(Figment::new().merge(Toml::string("app_name = \"x\"")));
    assert!(matches!(result, Err(ConfigError::Load(_))));
}
