//! 结算侧支付完成事件消费者
//!
//! 结算由定时任务按区间汇总，这里只记录触发

use async_trait::async_trait;
use commercium_common::OrderId;
use commercium_errors::AppResult;
use commercium_event_core::{EventEnvelope, IncomingMessage, MessageHandler};
use serde::Deserialize;
use tracing::info;

pub const SETTLEMENT_CONSUMER_GROUP: &str = "settlement-group";
pub const SETTLEMENT_CREATE_TOPIC: &str = "settlement.create";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettlementTriggerPayload {
    order_id: OrderId,
}

#[derive(Default)]
pub struct SettlementTriggerHandler;

#[async_trait]
impl MessageHandler for SettlementTriggerHandler {
    fn topics(&self) -> Vec<&'static str> {
        vec![SETTLEMENT_CREATE_TOPIC]
    }

    async fn handle(&self, message: &IncomingMessage) -> AppResult<()> {
        let envelope: EventEnvelope<SettlementTriggerPayload> = message.parse()?;
        info!(
            order_id = %envelope.data.order_id,
            event_type = %envelope.event_type,
            "Settlement trigger received, order will be included in the next scheduled run"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commercium_errors::AppError;

    #[tokio::test]
    async fn test_acknowledges_order_paid_event() {
        let order_id = OrderId::new();
        let payload = serde_json::json!({
            "event_id": uuid::Uuid::now_v7(),
            "event_type": "OrderPaid",
            "aggregate_type": "Order",
            "aggregate_id": order_id,
            "occurred_at": chrono::Utc::now(),
            "data": { "orderId": order_id, "userId": "user-1" },
        });
        let message = IncomingMessage {
            topic: SETTLEMENT_CREATE_TOPIC.to_string(),
            key: Some(order_id.to_string()),
            payload: payload.to_string(),
        };

        SettlementTriggerHandler.handle(&message).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_payload_without_order() {
        let message = IncomingMessage {
            topic: SETTLEMENT_CREATE_TOPIC.to_string(),
            key: None,
            payload: r#"{"data":{}}"#.to_string(),
        };
        let err = SettlementTriggerHandler.handle(&message).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
