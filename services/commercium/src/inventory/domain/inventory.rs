//! 库存聚合
//!
//! 可用量与预留量分开记账：下单预留，取消释放，付款后从预留中扣减。
//! 每次变更都生成一条流水，随聚合一起持久化。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use commercium_common::{InventoryId, InventoryTransactionId, OrderId, ProductId};
use commercium_domain_core::{AggregateRoot, Entity};
use commercium_errors::{AppError, AppResult};
use commercium_event_core::PendingEvents;
use serde::{Deserialize, Serialize};

use super::events::{InventoryEvent, StockDepleted, StockReleased, StockReserved};

/// 初始版本号
pub const INITIAL_VERSION: i32 = 1;

/// 库存数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockQuantity {
    pub available: i32,
    pub reserved: i32,
}

impl StockQuantity {
    pub fn new(available: i32, reserved: i32) -> AppResult<Self> {
        if available < 0 {
            return Err(AppError::validation("사용 가능한 재고는 0 이상이어야 합니다"));
        }
        if reserved < 0 {
            return Err(AppError::validation("예약된 재고는 0 이상이어야 합니다"));
        }
        Ok(Self { available, reserved })
    }

    pub fn total(&self) -> i32 {
        self.available + self.reserved
    }

    pub fn can_reserve(&self, quantity: i32) -> bool {
        self.available >= quantity
    }

    pub fn reserve(self, quantity: i32) -> AppResult<Self> {
        if !self.can_reserve(quantity) {
            return Err(AppError::business_rule(format!(
                "재고가 부족합니다. 요청: {}, 사용가능: {}",
                quantity, self.available
            )));
        }
        Ok(Self {
            available: self.available - quantity,
            reserved: self.reserved + quantity,
        })
    }

    pub fn release(self, quantity: i32) -> AppResult<Self> {
        if self.reserved < quantity {
            return Err(AppError::business_rule(format!(
                "해제할 예약 재고가 부족합니다. 요청: {}, 예약됨: {}",
                quantity, self.reserved
            )));
        }
        Ok(Self {
            available: self.available + quantity,
            reserved: self.reserved - quantity,
        })
    }

    pub fn decrease(self, quantity: i32) -> AppResult<Self> {
        if self.reserved < quantity {
            return Err(AppError::business_rule(format!(
                "차감할 예약 재고가 부족합니다. 요청: {}, 예약됨: {}",
                quantity, self.reserved
            )));
        }
        Ok(Self {
            available: self.available,
            reserved: self.reserved - quantity,
        })
    }

    pub fn increase(self, quantity: i32) -> Self {
        Self {
            available: self.available + quantity,
            reserved: self.reserved,
        }
    }
}

/// 流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryTransactionType {
    Increase,
    Decrease,
    Reserve,
    Release,
    Adjustment,
}

impl InventoryTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "INCREASE",
            Self::Decrease => "DECREASE",
            Self::Reserve => "RESERVE",
            Self::Release => "RELEASE",
            Self::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Increase => "입고",
            Self::Decrease => "출고",
            Self::Reserve => "예약",
            Self::Release => "해제",
            Self::Adjustment => "조정",
        }
    }
}

impl fmt::Display for InventoryTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryTransactionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCREASE" => Ok(Self::Increase),
            "DECREASE" => Ok(Self::Decrease),
            "RESERVE" => Ok(Self::Reserve),
            "RELEASE" => Ok(Self::Release),
            "ADJUSTMENT" => Ok(Self::Adjustment),
            other => Err(AppError::validation(format!(
                "Unknown inventory transaction type: {}",
                other
            ))),
        }
    }
}

/// 库存流水
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: InventoryTransactionId,
    pub product_id: ProductId,
    pub order_id: Option<OrderId>,
    pub transaction_type: InventoryTransactionType,
    pub quantity: i32,
    pub before: StockQuantity,
    pub after: StockQuantity,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// 库存聚合根
#[derive(Debug, Clone)]
pub struct Inventory {
    pub id: InventoryId,
    pub product_id: ProductId,
    pub stock: StockQuantity,
    /// 乐观锁版本，对应已持久化的状态
    pub version: i32,
    pub updated_at: DateTime<Utc>,
    transactions: Vec<InventoryTransaction>,
    events: PendingEvents<InventoryEvent>,
}

impl Inventory {
    pub fn create(product_id: ProductId, initial_quantity: i32) -> AppResult<Self> {
        let stock = StockQuantity::new(initial_quantity, 0)?;
        Ok(Self {
            id: InventoryId::new(),
            product_id,
            stock,
            version: INITIAL_VERSION,
            updated_at: Utc::now(),
            transactions: Vec::new(),
            events: PendingEvents::default(),
        })
    }

    pub fn restore(
        id: InventoryId,
        product_id: ProductId,
        stock: StockQuantity,
        version: i32,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            product_id,
            stock,
            version,
            updated_at,
            transactions: Vec::new(),
            events: PendingEvents::default(),
        }
    }

    /// 库存不足时记录 `StockDepleted` 后失败，调用方仍需发布该事件
    pub fn reserve(&mut self, order_id: OrderId, quantity: i32, reason: &str) -> AppResult<()> {
        ensure_positive_quantity(quantity)?;
        if !self.stock.can_reserve(quantity) {
            self.events.record(InventoryEvent::Depleted(StockDepleted {
                product_id: self.product_id.clone(),
                requested_quantity: quantity,
                available_quantity: self.stock.available,
            }));
            return Err(AppError::business_rule("재고가 부족합니다"));
        }

        let after = self.stock.reserve(quantity)?;
        self.apply(InventoryTransactionType::Reserve, Some(order_id), quantity, after, reason);
        self.events.record(InventoryEvent::Reserved(StockReserved {
            product_id: self.product_id.clone(),
            order_id,
            quantity,
        }));
        Ok(())
    }

    pub fn release_reservation(&mut self, order_id: OrderId, quantity: i32, reason: &str) -> AppResult<()> {
        ensure_positive_quantity(quantity)?;
        let after = self.stock.release(quantity)?;
        self.apply(InventoryTransactionType::Release, Some(order_id), quantity, after, reason);
        self.events.record(InventoryEvent::Released(StockReleased {
            product_id: self.product_id.clone(),
            order_id,
            quantity,
        }));
        Ok(())
    }

    /// 付款确认后出库
    pub fn decrease(&mut self, order_id: OrderId, quantity: i32, reason: &str) -> AppResult<()> {
        ensure_positive_quantity(quantity)?;
        let after = self.stock.decrease(quantity)?;
        self.apply(InventoryTransactionType::Decrease, Some(order_id), quantity, after, reason);
        Ok(())
    }

    pub fn increase(&mut self, quantity: i32, reason: &str) -> AppResult<()> {
        ensure_positive_quantity(quantity)?;
        let after = self.stock.increase(quantity);
        self.apply(InventoryTransactionType::Increase, None, quantity, after, reason);
        Ok(())
    }

    /// 盘点调整：可用量直接置为新值，预留清零
    pub fn adjust(&mut self, new_quantity: i32, reason: &str) -> AppResult<()> {
        let after = StockQuantity::new(new_quantity, 0)?;
        let delta = new_quantity - self.stock.total();
        self.apply(InventoryTransactionType::Adjustment, None, delta, after, reason);
        Ok(())
    }

    pub fn is_stock_sufficient(&self, quantity: i32) -> bool {
        self.stock.can_reserve(quantity)
    }

    /// 尚未持久化的流水
    pub fn pending_transactions(&self) -> &[InventoryTransaction] {
        &self.transactions
    }

    /// 保存成功后由仓储调用
    pub fn mark_persisted(&mut self, version: i32) {
        self.version = version;
        self.transactions.clear();
    }

    fn apply(
        &mut self,
        transaction_type: InventoryTransactionType,
        order_id: Option<OrderId>,
        quantity: i32,
        after: StockQuantity,
        reason: &str,
    ) {
        let now = Utc::now();
        self.transactions.push(InventoryTransaction {
            id: InventoryTransactionId::new(),
            product_id: self.product_id.clone(),
            order_id,
            transaction_type,
            quantity,
            before: self.stock,
            after,
            reason: reason.to_string(),
            created_at: now,
        });
        self.stock = after;
        self.updated_at = now;
    }
}

fn ensure_positive_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::validation("수량은 1개 이상이어야 합니다"));
    }
    Ok(())
}

impl Entity for Inventory {
    type Id = InventoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Inventory {
    type Event = InventoryEvent;

    fn pending_events(&mut self) -> &mut PendingEvents<Self::Event> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commercium_event_core::DomainEvent;

    fn inventory(initial: i32) -> Inventory {
        Inventory::create(ProductId::parse("P-1").unwrap(), initial).unwrap()
    }

    #[test]
    fn test_reserve_moves_available_to_reserved() {
        let mut inv = inventory(10);
        let order_id = OrderId::new();
        inv.reserve(order_id, 3, "주문 생성으로 인한 재고 예약").unwrap();

        assert_eq!(inv.stock, StockQuantity { available: 7, reserved: 3 });
        assert_eq!(inv.stock.total(), 10);

        let tx = &inv.pending_transactions()[0];
        assert_eq!(tx.transaction_type, InventoryTransactionType::Reserve);
        assert_eq!(tx.order_id, Some(order_id));
        assert_eq!(tx.before.available, 10);
        assert_eq!(tx.after.reserved, 3);

        let events = inv.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data.event_type(), "StockReserved");
    }

    #[test]
    fn test_insufficient_reserve_records_depleted_only() {
        let mut inv = inventory(2);
        let err = inv.reserve(OrderId::new(), 5, "예약").unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(ref m) if m == "재고가 부족합니다"));
        assert_eq!(inv.stock, StockQuantity { available: 2, reserved: 0 });
        assert!(inv.pending_transactions().is_empty());

        let events = inv.take_events();
        assert_eq!(events.len(), 1);
        match &events[0].data {
            InventoryEvent::Depleted(e) => {
                assert_eq!(e.requested_quantity, 5);
                assert_eq!(e.available_quantity, 2);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_release_and_decrease_require_reserved_stock() {
        let mut inv = inventory(10);
        let order_id = OrderId::new();
        inv.reserve(order_id, 4, "예약").unwrap();

        inv.release_reservation(order_id, 1, "해제").unwrap();
        assert_eq!(inv.stock, StockQuantity { available: 7, reserved: 3 });

        inv.decrease(order_id, 3, "차감").unwrap();
        assert_eq!(inv.stock, StockQuantity { available: 7, reserved: 0 });

        let err = inv.release_reservation(order_id, 1, "해제").unwrap_err();
        assert!(err.to_string().contains("해제할 예약 재고가 부족합니다"));
        let err = inv.decrease(order_id, 1, "차감").unwrap_err();
        assert!(err.to_string().contains("차감할 예약 재고가 부족합니다"));
    }

    #[test]
    fn test_adjust_resets_reserved_and_records_delta() {
        let mut inv = inventory(10);
        inv.reserve(OrderId::new(), 4, "예약").unwrap();
        inv.adjust(8, "실사").unwrap();

        assert_eq!(inv.stock, StockQuantity { available: 8, reserved: 0 });
        let tx = inv.pending_transactions().last().unwrap();
        assert_eq!(tx.transaction_type, InventoryTransactionType::Adjustment);
        assert_eq!(tx.quantity, -2);
        assert_eq!(tx.order_id, None);
    }

    #[test]
    fn test_mark_persisted_clears_transactions() {
        let mut inv = inventory(0);
        assert!(!inv.is_stock_sufficient(1));
        inv.increase(5, "입고").unwrap();
        assert!(inv.is_stock_sufficient(5));

        inv.mark_persisted(2);
        assert_eq!(inv.version, 2);
        assert!(inv.pending_transactions().is_empty());
    }

    #[test]
    fn test_rejects_non_positive_quantity_and_negative_initial() {
        let mut inv = inventory(5);
        assert!(matches!(inv.increase(0, "입고"), Err(AppError::Validation(_))));
        assert!(Inventory::create(ProductId::parse("P-2").unwrap(), -1).is_err());
    }
}
