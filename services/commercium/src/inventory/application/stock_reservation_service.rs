//! 订单驱动的库存预留、释放与扣减
//!
//! 每个商品的操作在分布式锁 `stock:{action}:{productId}` 内执行；
//! 锁之外的并发写入由仓储的乐观锁兜底。

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use commercium_common::{OrderId, ProductId};
use commercium_config::InventoryConfig;
use commercium_domain_core::AggregateRoot;
use commercium_errors::{AppError, AppResult};
use commercium_event_core::EventDispatcher;
use commercium_ports::DistributedLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::inventory::domain::{
    Inventory, InventoryDomainService, InventoryEvent, InventoryRepository,
    InventoryTransactionType,
};
use crate::shared::events::{Route, publish_events};

pub const RESERVE_REASON: &str = "주문 생성으로 인한 재고 예약";
pub const RELEASE_REASON: &str = "주문 취소로 인한 재고 해제";
pub const DECREASE_REASON: &str = "결제 완료로 인한 재고 차감";
const ROLLBACK_REASON: &str = "재고 예약 실패로 인한 재고 해제";

const LOCK_BUSY_MESSAGE: &str = "재고 처리 중입니다. 잠시 후 다시 시도해주세요.";

/// 订单中的一个商品数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// 库存事件路由，key 为商品 ID
pub fn inventory_event_routes(event: &InventoryEvent) -> Vec<Route> {
    let key = event.product_id();
    match event {
        InventoryEvent::Reserved(_) => vec![
            Route::new("inventory.stock-reserved", key),
            Route::new("notification.stock-reserved", key),
            Route::new("analytics.stock-movement", key),
        ],
        InventoryEvent::Released(_) => vec![
            Route::new("inventory.stock-released", key),
            Route::new("analytics.stock-movement", key),
        ],
        InventoryEvent::Depleted(_) => vec![
            Route::new("inventory.stock-depleted", key),
            Route::new("admin.stock-alert", key),
        ],
    }
}

fn lock_key(action: &str, product_id: &ProductId) -> String {
    format!("stock:{}:{}", action, product_id)
}

/// 消费者不会重试这类失败
fn is_final_failure(err: &AppError) -> bool {
    matches!(
        err,
        AppError::BusinessRule(_) | AppError::NotFound(_) | AppError::Validation(_)
    )
}

pub struct StockReservationService {
    repository: Arc<dyn InventoryRepository>,
    lock: Arc<dyn DistributedLock>,
    domain_service: InventoryDomainService,
    dispatcher: EventDispatcher,
    lock_wait: Duration,
    lock_lease: Duration,
}

impl StockReservationService {
    pub fn new(
        repository: Arc<dyn InventoryRepository>,
        lock: Arc<dyn DistributedLock>,
        dispatcher: EventDispatcher,
        config: &InventoryConfig,
    ) -> Self {
        Self {
            repository,
            lock,
            domain_service: InventoryDomainService::new(config.low_stock_threshold),
            dispatcher,
            lock_wait: Duration::from_secs(config.lock_wait_secs),
            lock_lease: Duration::from_secs(config.lock_lease_secs),
        }
    }

    pub async fn reserve_stock(
        &self,
        product_id: &ProductId,
        order_id: OrderId,
        quantity: i32,
    ) -> AppResult<Inventory> {
        self.domain_service.validate_bulk_order(product_id, quantity)?;

        self.with_lock(&lock_key("reserve", product_id), async {
            let mut inventory = self.load(product_id).await?;
            if let Err(e) = inventory.reserve(order_id, quantity, RESERVE_REASON) {
                warn!(
                    product_id = %product_id,
                    order_id = %order_id,
                    requested = quantity,
                    available = inventory.stock.available,
                    "Insufficient stock"
                );
                commercium_telemetry::metrics::record_business_event("inventory", "depleted");
                publish_events(&self.dispatcher, inventory.take_events(), inventory_event_routes).await;
                return Err(e);
            }

            self.save_and_publish(&mut inventory).await?;
            self.check_low_stock(&inventory);
            commercium_telemetry::metrics::record_business_event("inventory", "reserved");
            info!(product_id = %product_id, order_id = %order_id, quantity, "Stock reserved");
            Ok(inventory)
        })
        .await
    }

    pub async fn release_stock(
        &self,
        product_id: &ProductId,
        order_id: OrderId,
        quantity: i32,
    ) -> AppResult<Inventory> {
        self.release_with_reason(product_id, order_id, quantity, RELEASE_REASON)
            .await
    }

    pub async fn decrease_stock(
        &self,
        product_id: &ProductId,
        order_id: OrderId,
        quantity: i32,
    ) -> AppResult<Inventory> {
        self.with_lock(&lock_key("decrease", product_id), async {
            let mut inventory = self.load(product_id).await?;
            inventory.decrease(order_id, quantity, DECREASE_REASON)?;
            self.save_and_publish(&mut inventory).await?;
            self.check_low_stock(&inventory);
            commercium_telemetry::metrics::record_business_event("inventory", "decreased");
            info!(product_id = %product_id, order_id = %order_id, quantity, "Stock decreased");
            Ok(inventory)
        })
        .await
    }

    /// 预留订单的全部商品
    ///
    /// 已有预留记录的商品跳过，重复投递不会重复占用库存。
    /// 不可重试的失败会回滚本次已预留的商品。
    pub async fn reserve_order(&self, order_id: OrderId, lines: &[StockLine]) -> AppResult<()> {
        let already_reserved = self.reserved_products(order_id).await?;
        let mut reserved: Vec<&StockLine> = Vec::new();

        for line in lines {
            if already_reserved.contains(&line.product_id) {
                info!(order_id = %order_id, product_id = %line.product_id, "Stock already reserved, skipping");
                continue;
            }

            match self.reserve_stock(&line.product_id, order_id, line.quantity).await {
                Ok(_) => reserved.push(line),
                Err(e) => {
                    if is_final_failure(&e) {
                        self.rollback(order_id, &reserved).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// 释放订单仍处于预留状态的库存
    ///
    /// `lines` 为空时按流水推算该订单全部未结的预留量
    pub async fn release_order(&self, order_id: OrderId, lines: Option<&[StockLine]>) -> AppResult<()> {
        for (product_id, quantity) in self.settle_quantities(order_id, lines).await? {
            self.release_stock(&product_id, order_id, quantity).await?;
        }
        Ok(())
    }

    /// 扣减订单仍处于预留状态的库存
    pub async fn decrease_order(&self, order_id: OrderId, lines: Option<&[StockLine]>) -> AppResult<()> {
        for (product_id, quantity) in self.settle_quantities(order_id, lines).await? {
            self.decrease_stock(&product_id, order_id, quantity).await?;
        }
        Ok(())
    }

    /// 每个商品的未结预留量 = 预留 - 释放 - 扣减
    pub async fn outstanding_reservations(&self, order_id: OrderId) -> AppResult<BTreeMap<ProductId, i32>> {
        let mut outstanding: BTreeMap<ProductId, i32> = BTreeMap::new();
        for tx in self.repository.find_transactions_by_order_id(&order_id).await? {
            let delta = match tx.transaction_type {
                InventoryTransactionType::Reserve => tx.quantity,
                InventoryTransactionType::Release | InventoryTransactionType::Decrease => -tx.quantity,
                _ => 0,
            };
            *outstanding.entry(tx.product_id).or_default() += delta;
        }
        outstanding.retain(|_, q| *q > 0);
        Ok(outstanding)
    }

    async fn reserved_products(&self, order_id: OrderId) -> AppResult<BTreeSet<ProductId>> {
        Ok(self
            .repository
            .find_transactions_by_order_id(&order_id)
            .await?
            .into_iter()
            .filter(|t| t.transaction_type == InventoryTransactionType::Reserve)
            .map(|t| t.product_id)
            .collect())
    }

    async fn settle_quantities(
        &self,
        order_id: OrderId,
        lines: Option<&[StockLine]>,
    ) -> AppResult<Vec<(ProductId, i32)>> {
        let outstanding = self.outstanding_reservations(order_id).await?;
        let Some(lines) = lines else {
            return Ok(outstanding.into_iter().collect());
        };

        let mut result = Vec::new();
        for line in lines {
            let open = outstanding.get(&line.product_id).copied().unwrap_or(0);
            let quantity = line.quantity.min(open);
            if quantity <= 0 {
                info!(order_id = %order_id, product_id = %line.product_id, "No outstanding reservation, skipping");
                continue;
            }
            result.push((line.product_id.clone(), quantity));
        }
        Ok(result)
    }

    async fn rollback(&self, order_id: OrderId, reserved: &[&StockLine]) {
        for line in reserved {
            if let Err(e) = self
                .release_with_reason(&line.product_id, order_id, line.quantity, ROLLBACK_REASON)
                .await
            {
                warn!(
                    order_id = %order_id,
                    product_id = %line.product_id,
                    error = %e,
                    "Failed to roll back stock reservation"
                );
            }
        }
    }

    async fn release_with_reason(
        &self,
        product_id: &ProductId,
        order_id: OrderId,
        quantity: i32,
        reason: &str,
    ) -> AppResult<Inventory> {
        self.with_lock(&lock_key("release", product_id), async {
            let mut inventory = self.load(product_id).await?;
            inventory.release_reservation(order_id, quantity, reason)?;
            self.save_and_publish(&mut inventory).await?;
            commercium_telemetry::metrics::record_business_event("inventory", "released");
            info!(product_id = %product_id, order_id = %order_id, quantity, "Stock reservation released");
            Ok(inventory)
        })
        .await
    }

    async fn with_lock<T, F>(&self, key: &str, work: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let Some(token) = self
            .lock
            .acquire_with_wait(key, self.lock_wait, self.lock_lease)
            .await?
        else {
            warn!(lock_key = key, "Failed to acquire stock lock");
            return Err(AppError::resource_exhausted(LOCK_BUSY_MESSAGE));
        };

        let result = work.await;

        if let Err(e) = self.lock.release(key, &token).await {
            warn!(lock_key = key, error = %e, "Failed to release stock lock");
        }
        result
    }

    async fn load(&self, product_id: &ProductId) -> AppResult<Inventory> {
        self.repository
            .find_by_product_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("상품 재고 정보를 찾을 수 없습니다"))
    }

    async fn save_and_publish(&self, inventory: &mut Inventory) -> AppResult<()> {
        self.repository.save(inventory).await?;
        publish_events(&self.dispatcher, inventory.take_events(), inventory_event_routes).await;
        Ok(())
    }

    fn check_low_stock(&self, inventory: &Inventory) {
        if self.domain_service.should_notify_low_stock(inventory) {
            warn!(
                product_id = %inventory.product_id,
                available = inventory.stock.available,
                "Low stock"
            );
            commercium_telemetry::metrics::record_business_event("inventory", "low_stock");
        }
    }
}
