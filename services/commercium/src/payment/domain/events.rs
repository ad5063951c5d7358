//! 支付领域事件

use commercium_common::{OrderId, PaymentId};
use commercium_domain_core::Decimal;
use commercium_event_core::DomainEvent;
use serde::{Deserialize, Serialize};

use super::payment::PaymentMethod;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompleted {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    pub paid_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailed {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub failure_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCancelled {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub cancelled_amount: Decimal,
    pub reason: String,
}

/// 支付事件
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PaymentEvent {
    Completed(PaymentCompleted),
    Failed(PaymentFailed),
    Cancelled(PaymentCancelled),
}

impl PaymentEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::Completed(e) => e.order_id,
            Self::Failed(e) => e.order_id,
            Self::Cancelled(e) => e.order_id,
        }
    }

    fn payment_id(&self) -> PaymentId {
        match self {
            Self::Completed(e) => e.payment_id,
            Self::Failed(e) => e.payment_id,
            Self::Cancelled(e) => e.payment_id,
        }
    }
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Completed(_) => "PaymentCompleted",
            Self::Failed(_) => "PaymentFailed",
            Self::Cancelled(_) => "PaymentCancelled",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "Payment"
    }

    fn aggregate_id(&self) -> String {
        self.payment_id().to_string()
    }
}
