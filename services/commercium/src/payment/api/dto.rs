//! 支付 API 请求/响应体

use chrono::{DateTime, Utc};
use commercium_common::OrderId;
use commercium_domain_core::Decimal;
use commercium_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::payment::application::CreatePaymentCommand;
use crate::payment::domain::{Payment, PaymentMethod, format_pg_error};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, message = "주문 ID는 필수입니다"))]
    pub order_id: String,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
    pub customer_name: Option<String>,
    #[validate(email(message = "이메일 형식이 올바르지 않습니다"))]
    pub customer_email: Option<String>,
}

impl CreatePaymentRequest {
    pub fn into_command(self) -> AppResult<CreatePaymentCommand> {
        if self.amount < Decimal::ONE {
            return Err(AppError::validation("결제 금액은 1원 이상이어야 합니다"));
        }
        let order_id = OrderId::from_string(&self.order_id)
            .map_err(|_| AppError::validation("잘못된 주문 ID 형식입니다"))?;

        Ok(CreatePaymentCommand {
            order_id,
            method: self.payment_method,
            amount: self.amount,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            return_url: self.return_url,
            cancel_url: self.cancel_url,
        })
    }
}

fn default_cancel_reason() -> String {
    "고객 요청".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPaymentParams {
    pub cancel_amount: Decimal,
    #[serde(default = "default_cancel_reason")]
    pub reason: String,
}

impl CancelPaymentParams {
    pub fn validated_amount(&self) -> AppResult<Decimal> {
        if self.cancel_amount < Decimal::new(1, 2) {
            return Err(AppError::validation("취소 금액은 0.01 이상이어야 합니다"));
        }
        Ok(self.cancel_amount)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCallbackParams {
    pub payment_key: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailCallbackParams {
    pub payment_key: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl FailCallbackParams {
    pub fn formatted_error(&self) -> String {
        format_pg_error(self.error_code.as_deref(), self.error_message.as_deref())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment_id: String,
    pub order_id: String,
    pub payment_method: PaymentMethod,
    pub payment_method_description: String,
    pub status: String,
    pub status_description: String,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub cancelled_amount: Decimal,
    pub refundable_amount: Decimal,
    pub payment_provider: String,
    pub external_payment_id: Option<String>,
    pub transaction_id: Option<String>,
    pub failed_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id.to_string(),
            order_id: payment.order_id.to_string(),
            payment_method: payment.method,
            payment_method_description: payment.method.description().to_string(),
            status: payment.status.as_str().to_string(),
            status_description: payment.status.description().to_string(),
            total_amount: payment.amount.total,
            paid_amount: payment.amount.paid,
            cancelled_amount: payment.amount.cancelled,
            refundable_amount: payment.amount.refundable(),
            payment_provider: payment.provider.name.clone(),
            external_payment_id: payment.provider.external_payment_id.clone(),
            transaction_id: payment.provider.transaction_id.clone(),
            failed_reason: payment.failed_reason.clone(),
            paid_at: payment.paid_at,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}
