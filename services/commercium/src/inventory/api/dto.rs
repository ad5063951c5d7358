//! 库存 API 请求/响应体

use chrono::{DateTime, Utc};
use commercium_common::{OrderId, ProductId};
use commercium_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::inventory::domain::{Inventory, InventoryTransaction, InventoryTransactionType};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryParams {
    #[validate(range(min = 0, message = "초기 재고는 0 이상이어야 합니다"))]
    pub initial_quantity: i32,
}

fn default_increase_reason() -> String {
    "관리자 입고".to_string()
}

fn default_adjust_reason() -> String {
    "관리자 재고 조정".to_string()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IncreaseStockParams {
    #[validate(range(min = 1, message = "입고 수량은 1개 이상이어야 합니다"))]
    pub quantity: i32,
    #[serde(default = "default_increase_reason")]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockParams {
    #[validate(range(min = 0, message = "조정 수량은 0 이상이어야 합니다"))]
    pub new_quantity: i32,
    #[serde(default = "default_adjust_reason")]
    pub reason: String,
}

/// 预留/释放/扣减共用的请求体
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockReservationRequest {
    #[validate(length(min = 1, message = "상품 ID는 필수입니다"))]
    pub product_id: String,
    #[validate(length(min = 1, message = "주문 ID는 필수입니다"))]
    pub order_id: String,
    #[validate(range(min = 1, message = "수량은 1개 이상이어야 합니다"))]
    pub quantity: i32,
}

impl StockReservationRequest {
    pub fn parse_ids(&self) -> AppResult<(ProductId, OrderId)> {
        let product_id = ProductId::parse(self.product_id.clone()).map_err(AppError::validation)?;
        let order_id = OrderId::from_string(&self.order_id)
            .map_err(|_| AppError::validation("잘못된 주문 ID 형식입니다"))?;
        Ok((product_id, order_id))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub inventory_id: String,
    pub product_id: String,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub total_quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<&Inventory> for InventoryResponse {
    fn from(inventory: &Inventory) -> Self {
        Self {
            inventory_id: inventory.id.to_string(),
            product_id: inventory.product_id.to_string(),
            available_quantity: inventory.stock.available,
            reserved_quantity: inventory.stock.reserved,
            total_quantity: inventory.stock.total(),
            updated_at: inventory.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTransactionResponse {
    pub transaction_id: String,
    pub product_id: String,
    pub order_id: Option<String>,
    pub transaction_type: InventoryTransactionType,
    pub transaction_description: String,
    pub quantity: i32,
    pub before_available: i32,
    pub after_available: i32,
    pub before_reserved: i32,
    pub after_reserved: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<&InventoryTransaction> for StockTransactionResponse {
    fn from(tx: &InventoryTransaction) -> Self {
        Self {
            transaction_id: tx.id.to_string(),
            product_id: tx.product_id.to_string(),
            order_id: tx.order_id.map(|id| id.to_string()),
            transaction_type: tx.transaction_type,
            transaction_description: tx.transaction_type.description().to_string(),
            quantity: tx.quantity,
            before_available: tx.before.available,
            after_available: tx.after.available,
            before_reserved: tx.before.reserved,
            after_reserved: tx.after.reserved,
            reason: tx.reason.clone(),
            created_at: tx.created_at,
        }
    }
}
