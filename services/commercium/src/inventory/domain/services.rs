//! 库存领域服务

use commercium_common::ProductId;
use commercium_errors::{AppError, AppResult};

use super::inventory::Inventory;

/// 单次下单的数量上限
pub const MAX_UNITS_PER_ORDER: i32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct InventoryDomainService {
    low_stock_threshold: i32,
}

impl InventoryDomainService {
    pub fn new(low_stock_threshold: i32) -> Self {
        Self { low_stock_threshold }
    }

    pub fn validate_bulk_order(&self, product_id: &ProductId, quantity: i32) -> AppResult<()> {
        if quantity > MAX_UNITS_PER_ORDER {
            return Err(AppError::business_rule(format!(
                "상품 {}는 1회 최대 {}개까지만 주문 가능합니다",
                product_id, MAX_UNITS_PER_ORDER
            )));
        }
        Ok(())
    }

    pub fn should_notify_low_stock(&self, inventory: &Inventory) -> bool {
        inventory.stock.available <= self.low_stock_threshold
    }

    pub fn validate_stock_adjustment(&self, inventory: &Inventory, new_quantity: i32) -> AppResult<()> {
        if new_quantity < inventory.stock.reserved {
            return Err(AppError::business_rule(format!(
                "새 재고 수량({})이 예약된 수량({})보다 작을 수 없습니다",
                new_quantity, inventory.stock.reserved
            )));
        }
        Ok(())
    }
}

impl Default for InventoryDomainService {
    fn default() -> Self {
        Self::new(10)
    }
}
