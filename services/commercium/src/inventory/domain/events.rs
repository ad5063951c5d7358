//! 库存领域事件

use commercium_common::{OrderId, ProductId};
use commercium_event_core::DomainEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReserved {
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReleased {
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub quantity: i32,
}

/// 预留失败时的缺货告警
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDepleted {
    pub product_id: ProductId,
    pub requested_quantity: i32,
    pub available_quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InventoryEvent {
    Reserved(StockReserved),
    Released(StockReleased),
    Depleted(StockDepleted),
}

impl InventoryEvent {
    pub fn product_id(&self) -> &ProductId {
        match self {
            Self::Reserved(e) => &e.product_id,
            Self::Released(e) => &e.product_id,
            Self::Depleted(e) => &e.product_id,
        }
    }
}

impl DomainEvent for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Reserved(_) => "StockReserved",
            Self::Released(_) => "StockReleased",
            Self::Depleted(_) => "StockDepleted",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "Inventory"
    }

    fn aggregate_id(&self) -> String {
        self.product_id().to_string()
    }
}
