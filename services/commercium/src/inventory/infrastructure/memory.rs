//! 内存库存 Repository，用于本地开发与测试

use std::collections::HashMap;

use async_trait::async_trait;
use commercium_common::{OrderId, ProductId};
use commercium_domain_core::AggregateRoot;
use commercium_errors::{AppError, AppResult};
use parking_lot::RwLock;

use crate::inventory::domain::{Inventory, InventoryRepository, InventoryTransaction};

use super::VERSION_CONFLICT_MESSAGE;

#[derive(Default)]
struct Store {
    inventories: HashMap<ProductId, Inventory>,
    transactions: Vec<InventoryTransaction>,
}

#[derive(Default)]
pub struct InMemoryInventoryRepository {
    store: RwLock<Store>,
}

impl InMemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn save(&self, inventory: &mut Inventory) -> AppResult<()> {
        let mut store = self.store.write();

        let next_version = match store.inventories.get(&inventory.product_id) {
            Some(current) if current.id != inventory.id => {
                return Err(AppError::conflict("이미 재고가 존재하는 상품입니다"));
            }
            Some(current) if current.version != inventory.version => {
                return Err(AppError::conflict(VERSION_CONFLICT_MESSAGE));
            }
            Some(current) => current.version + 1,
            None => inventory.version,
        };

        store
            .transactions
            .extend(inventory.pending_transactions().iter().cloned());
        inventory.mark_persisted(next_version);

        let mut stored = inventory.clone();
        // 事件由调用方负责发布
        stored.take_events();
        store.inventories.insert(stored.product_id.clone(), stored);
        Ok(())
    }

    async fn find_by_product_id(&self, product_id: &ProductId) -> AppResult<Option<Inventory>> {
        Ok(self.store.read().inventories.get(product_id).cloned())
    }

    async fn exists_by_product_id(&self, product_id: &ProductId) -> AppResult<bool> {
        Ok(self.store.read().inventories.contains_key(product_id))
    }

    async fn find_transactions_by_product_id(
        &self,
        product_id: &ProductId,
    ) -> AppResult<Vec<InventoryTransaction>> {
        let mut txs: Vec<InventoryTransaction> = self
            .store
            .read()
            .transactions
            .iter()
            .filter(|t| &t.product_id == product_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(txs)
    }

    async fn find_transactions_by_order_id(&self, order_id: &OrderId) -> AppResult<Vec<InventoryTransaction>> {
        Ok(self
            .store
            .read()
            .transactions
            .iter()
            .filter(|t| t.order_id.as_ref() == Some(order_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_version_is_conflict() {
        let repo = InMemoryInventoryRepository::new();
        let pid = ProductId::parse("P-1").unwrap();
        let mut inv = Inventory::create(pid.clone(), 10).unwrap();
        repo.save(&mut inv).await.unwrap();
        assert_eq!(inv.version, 1);

        let mut first = repo.find_by_product_id(&pid).await.unwrap().unwrap();
        let mut second = first.clone();

        first.increase(1, "입고").unwrap();
        repo.save(&mut first).await.unwrap();
        assert_eq!(first.version, 2);

        second.increase(2, "입고").unwrap();
        let err = repo.save(&mut second).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = repo.find_by_product_id(&pid).await.unwrap().unwrap();
        assert_eq!(stored.stock.available, 11);
        assert_eq!(repo.find_transactions_by_product_id(&pid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_product_is_conflict() {
        let repo = InMemoryInventoryRepository::new();
        let pid = ProductId::parse("P-1").unwrap();
        repo.save(&mut Inventory::create(pid.clone(), 1).unwrap()).await.unwrap();

        let err = repo
            .save(&mut Inventory::create(pid, 5).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
