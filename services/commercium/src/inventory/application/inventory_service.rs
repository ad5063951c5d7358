//! 库存管理服务：建档、入库、盘点调整与流水查询

use std::sync::Arc;

use commercium_common::{OrderId, ProductId};
use commercium_domain_core::AggregateRoot;
use commercium_errors::{AppError, AppResult};
use commercium_event_core::EventDispatcher;
use tracing::info;

use crate::inventory::domain::{
    Inventory, InventoryDomainService, InventoryRepository, InventoryTransaction,
};
use crate::shared::events::publish_events;

use super::stock_reservation_service::inventory_event_routes;

pub struct InventoryService {
    repository: Arc<dyn InventoryRepository>,
    domain_service: InventoryDomainService,
    dispatcher: EventDispatcher,
}

impl InventoryService {
    pub fn new(
        repository: Arc<dyn InventoryRepository>,
        domain_service: InventoryDomainService,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            repository,
            domain_service,
            dispatcher,
        }
    }

    pub async fn create_inventory(&self, product_id: ProductId, initial_quantity: i32) -> AppResult<Inventory> {
        if self.repository.exists_by_product_id(&product_id).await? {
            return Err(AppError::conflict("이미 재고가 존재하는 상품입니다"));
        }

        let mut inventory = Inventory::create(product_id, initial_quantity)?;
        self.save_and_publish(&mut inventory).await?;

        info!(
            product_id = %inventory.product_id,
            initial_quantity,
            "Inventory created"
        );
        Ok(inventory)
    }

    pub async fn get_inventory(&self, product_id: &ProductId) -> AppResult<Inventory> {
        self.repository
            .find_by_product_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("재고 정보를 찾을 수 없습니다"))
    }

    pub async fn increase_stock(&self, product_id: &ProductId, quantity: i32, reason: &str) -> AppResult<Inventory> {
        let mut inventory = self.get_inventory(product_id).await?;
        inventory.increase(quantity, reason)?;
        self.save_and_publish(&mut inventory).await?;

        commercium_telemetry::metrics::record_business_event("inventory", "increased");
        info!(product_id = %product_id, quantity, reason, "Stock increased");
        Ok(inventory)
    }

    pub async fn adjust_stock(&self, product_id: &ProductId, new_quantity: i32, reason: &str) -> AppResult<Inventory> {
        let mut inventory = self.get_inventory(product_id).await?;
        self.domain_service
            .validate_stock_adjustment(&inventory, new_quantity)?;
        let previous = inventory.stock;
        inventory.adjust(new_quantity, reason)?;
        self.save_and_publish(&mut inventory).await?;

        commercium_telemetry::metrics::record_business_event("inventory", "adjusted");
        info!(
            product_id = %product_id,
            previous_available = previous.available,
            previous_reserved = previous.reserved,
            new_quantity,
            reason,
            "Stock adjusted"
        );
        Ok(inventory)
    }

    pub async fn get_stock_transactions(&self, product_id: &ProductId) -> AppResult<Vec<InventoryTransaction>> {
        self.repository.find_transactions_by_product_id(product_id).await
    }

    pub async fn get_order_stock_transactions(&self, order_id: &OrderId) -> AppResult<Vec<InventoryTransaction>> {
        self.repository.find_transactions_by_order_id(order_id).await
    }

    async fn save_and_publish(&self, inventory: &mut Inventory) -> AppResult<()> {
        self.repository.save(inventory).await?;
        publish_events(&self.dispatcher, inventory.take_events(), inventory_event_routes).await;
        Ok(())
    }
}
