//! PG（支付网关）端口

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commercium_common::OrderId;
use commercium_domain_core::Decimal;
use commercium_errors::AppResult;

use super::payment::PaymentMethod;

pub const PG_STATUS_COMPLETED: &str = "COMPLETED";
pub const PG_STATUS_FAILED: &str = "FAILED";

/// 发往 PG 的支付请求
#[derive(Debug, Clone, PartialEq)]
pub struct PgPaymentRequest {
    pub order_name: String,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// PG 支付响应
#[derive(Debug, Clone, PartialEq)]
pub struct PgPaymentResponse {
    pub payment_key: String,
    pub transaction_id: Option<String>,
    pub order_id: Option<OrderId>,
    pub amount: Decimal,
    pub status: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
}

impl PgPaymentResponse {
    pub fn is_success(&self) -> bool {
        self.status == PG_STATUS_COMPLETED
    }

    pub fn is_failed(&self) -> bool {
        self.status == PG_STATUS_FAILED
    }

    pub fn failure_reason(&self) -> String {
        format_pg_error(self.failure_code.as_deref(), self.failure_message.as_deref())
    }
}

/// PG 取消响应
#[derive(Debug, Clone, PartialEq)]
pub struct PgCancelResponse {
    pub payment_key: String,
    pub cancelled_amount: Decimal,
    pub cancelled_at: DateTime<Utc>,
}

/// `[code] msg`；缺少 code 时只用 msg
pub fn format_pg_error(code: Option<&str>, message: Option<&str>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!("[{}] {}", code, message),
        (None, Some(message)) => message.to_string(),
        _ => "알 수 없는 오류".to_string(),
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn request_payment(&self, request: PgPaymentRequest) -> AppResult<PgPaymentResponse>;

    async fn cancel_payment(
        &self,
        payment_key: &str,
        amount: Decimal,
        reason: &str,
    ) -> AppResult<PgCancelResponse>;

    async fn get_payment(&self, payment_key: &str) -> AppResult<PgPaymentResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pg_error() {
        assert_eq!(
            format_pg_error(Some("INSUFFICIENT_BALANCE"), Some("잔액 부족")),
            "[INSUFFICIENT_BALANCE] 잔액 부족"
        );
        assert_eq!(format_pg_error(None, Some("잔액 부족")), "잔액 부족");
        assert_eq!(format_pg_error(Some("E1"), None), "알 수 없는 오류");
        assert_eq!(format_pg_error(None, None), "알 수 없는 오류");
    }
}
