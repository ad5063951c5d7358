//! 库存侧订单/支付事件消费者
//!
//! - `inventory.reserve`：订单创建，逐个商品预留
//! - `inventory.restore`：订单取消或支付失败，释放预留
//! - `inventory.decrease`：支付完成，从预留中扣减
//!
//! 支付事件不带商品明细，此时按订单的库存流水推算

use std::sync::Arc;

use async_trait::async_trait;
use commercium_common::OrderId;
use commercium_errors::{AppError, AppResult};
use commercium_event_core::{EventEnvelope, IncomingMessage, MessageHandler};
use serde::Deserialize;
use tracing::info;

use crate::inventory::application::{StockLine, StockReservationService};

pub const INVENTORY_CONSUMER_GROUP: &str = "inventory-group";
pub const RESERVE_TOPIC: &str = "inventory.reserve";
pub const RESTORE_TOPIC: &str = "inventory.restore";
pub const DECREASE_TOPIC: &str = "inventory.decrease";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStockPayload {
    order_id: OrderId,
    #[serde(default)]
    items: Vec<StockLine>,
}

impl OrderStockPayload {
    fn lines(&self) -> Option<&[StockLine]> {
        if self.items.is_empty() {
            None
        } else {
            Some(&self.items)
        }
    }
}

pub struct InventoryOrderEventHandler {
    reservations: Arc<StockReservationService>,
}

impl InventoryOrderEventHandler {
    pub fn new(reservations: Arc<StockReservationService>) -> Self {
        Self { reservations }
    }
}

#[async_trait]
impl MessageHandler for InventoryOrderEventHandler {
    fn topics(&self) -> Vec<&'static str> {
        vec![RESERVE_TOPIC, RESTORE_TOPIC, DECREASE_TOPIC]
    }

    async fn handle(&self, message: &IncomingMessage) -> AppResult<()> {
        let envelope: EventEnvelope<OrderStockPayload> = message.parse()?;
        let payload = envelope.data;
        info!(
            order_id = %payload.order_id,
            topic = %message.topic,
            event_type = %envelope.event_type,
            item_count = payload.items.len(),
            "Inventory event received"
        );

        match message.topic.as_str() {
            RESERVE_TOPIC => {
                let Some(lines) = payload.lines() else {
                    return Err(AppError::validation("재고 예약 대상 상품이 없습니다"));
                };
                self.reservations.reserve_order(payload.order_id, lines).await?;
            }
            RESTORE_TOPIC => {
                self.reservations
                    .release_order(payload.order_id, payload.lines())
                    .await?;
            }
            DECREASE_TOPIC => {
                self.reservations
                    .decrease_order(payload.order_id, payload.lines())
                    .await?;
            }
            other => {
                return Err(AppError::validation(format!("Unsupported topic: {}", other)));
            }
        }

        info!(order_id = %payload.order_id, topic = %message.topic, "Inventory event processed");
        Ok(())
    }
}
