//! 订单领域事件

use commercium_common::{OrderId, ProductId, UserId};
use commercium_domain_core::Decimal;
use commercium_event_core::DomainEvent;
use serde::{Deserialize, Serialize};

/// 事件中携带的商品数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaid {
    pub order_id: OrderId,
    pub items: Vec<OrderLine>,
}

/// 订单事件
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OrderEvent {
    Created(OrderCreated),
    Cancelled(OrderCancelled),
    Paid(OrderPaid),
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::Created(e) => e.order_id,
            Self::Cancelled(e) => e.order_id,
            Self::Paid(e) => e.order_id,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "OrderCreated",
            Self::Cancelled(_) => "OrderCancelled",
            Self::Paid(_) => "OrderPaid",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "Order"
    }

    fn aggregate_id(&self) -> String {
        self.order_id().to_string()
    }
}
