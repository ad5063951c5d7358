//! 订单侧支付事件消费者
//!
//! `order.payment-completed` 到达后将订单标记为已付款

use std::sync::Arc;

use async_trait::async_trait;
use commercium_common::OrderId;
use commercium_errors::AppResult;
use commercium_event_core::{EventEnvelope, IncomingMessage, MessageHandler};
use serde::Deserialize;
use tracing::info;

use crate::order::application::OrderService;

pub const ORDER_CONSUMER_GROUP: &str = "order-group";
pub const PAYMENT_COMPLETED_TOPIC: &str = "order.payment-completed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentCompletedPayload {
    order_id: OrderId,
}

pub struct OrderPaymentEventHandler {
    orders: Arc<OrderService>,
}

impl OrderPaymentEventHandler {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl MessageHandler for OrderPaymentEventHandler {
    fn topics(&self) -> Vec<&'static str> {
        vec![PAYMENT_COMPLETED_TOPIC]
    }

    async fn handle(&self, message: &IncomingMessage) -> AppResult<()> {
        let envelope: EventEnvelope<PaymentCompletedPayload> = message.parse()?;
        let order_id = envelope.data.order_id;
        info!(order_id = %order_id, topic = %message.topic, "Payment completed event received");

        let confirmed = self.orders.confirm_payment_if_placed(&order_id).await?;
        info!(order_id = %order_id, confirmed, "Payment completed event processed");
        Ok(())
    }
}
