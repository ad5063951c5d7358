//! 模拟 PG
//!
//! 按支付方式的成功率随机返回结果，虚拟账户总是受理成功（等待入金）

use async_trait::async_trait;
use chrono::Utc;
use commercium_config::PaymentConfig;
use commercium_domain_core::Decimal;
use commercium_errors::AppResult;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::payment::domain::{
    PG_STATUS_COMPLETED, PG_STATUS_FAILED, PaymentGateway, PaymentMethod, PgCancelResponse,
    PgPaymentRequest, PgPaymentResponse,
};

pub const INSUFFICIENT_BALANCE: &str = "INSUFFICIENT_BALANCE";

#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    card_success_rate: f64,
    bank_transfer_success_rate: f64,
    default_success_rate: f64,
}

impl MockPaymentGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            card_success_rate: config.card_success_rate,
            bank_transfer_success_rate: config.bank_transfer_success_rate,
            default_success_rate: config.default_success_rate,
        }
    }

    pub fn success_rate(&self, method: PaymentMethod) -> f64 {
        match method {
            PaymentMethod::Card => self.card_success_rate,
            PaymentMethod::BankTransfer => self.bank_transfer_success_rate,
            PaymentMethod::VirtualAccount => 1.0,
            PaymentMethod::Mobile | PaymentMethod::Point => self.default_success_rate,
        }
    }

    fn simulate(&self, method: PaymentMethod) -> bool {
        let rate = self.success_rate(method).clamp(0.0, 1.0);
        rand::thread_rng().gen_bool(rate)
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new(&PaymentConfig::default())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn request_payment(&self, request: PgPaymentRequest) -> AppResult<PgPaymentResponse> {
        info!(
            order_id = %request.order_id,
            amount = %request.amount,
            method = %request.payment_method,
            "Mock PG payment requested"
        );

        let payment_key = format!("mock_payment_{}", Uuid::new_v4());
        let transaction_id = format!("mock_tx_{}", Utc::now().timestamp_millis());
        let success = self.simulate(request.payment_method);

        let response = PgPaymentResponse {
            payment_key,
            transaction_id: Some(transaction_id),
            order_id: Some(request.order_id),
            amount: request.amount,
            status: if success { PG_STATUS_COMPLETED } else { PG_STATUS_FAILED }.to_string(),
            approved_at: success.then(Utc::now),
            failure_code: (!success).then(|| INSUFFICIENT_BALANCE.to_string()),
            failure_message: (!success).then(|| "잔액 부족".to_string()),
        };

        info!(payment_key = %response.payment_key, status = %response.status, "Mock PG payment responded");
        Ok(response)
    }

    async fn cancel_payment(
        &self,
        payment_key: &str,
        amount: Decimal,
        reason: &str,
    ) -> AppResult<PgCancelResponse> {
        info!(payment_key, amount = %amount, reason, "Mock PG payment cancelled");
        Ok(PgCancelResponse {
            payment_key: payment_key.to_string(),
            cancelled_amount: amount,
            cancelled_at: Utc::now(),
        })
    }

    async fn get_payment(&self, payment_key: &str) -> AppResult<PgPaymentResponse> {
        info!(payment_key, "Mock PG payment lookup");
        Ok(PgPaymentResponse {
            payment_key: payment_key.to_string(),
            transaction_id: None,
            order_id: None,
            amount: Decimal::from(10000),
            status: PG_STATUS_COMPLETED.to_string(),
            approved_at: Some(Utc::now()),
            failure_code: None,
            failure_message: None,
        })
    }
}
