//! 库存 Repository trait

use async_trait::async_trait;
use commercium_common::{OrderId, ProductId};
use commercium_errors::AppResult;

use super::inventory::{Inventory, InventoryTransaction};

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// 以 `version` 做乐观锁保存，连同待持久化流水写入；成功后回写新版本
    ///
    /// 版本不匹配返回 Conflict
    async fn save(&self, inventory: &mut Inventory) -> AppResult<()>;

    async fn find_by_product_id(&self, product_id: &ProductId) -> AppResult<Option<Inventory>>;

    async fn exists_by_product_id(&self, product_id: &ProductId) -> AppResult<bool>;

    /// 按时间倒序
    async fn find_transactions_by_product_id(
        &self,
        product_id: &ProductId,
    ) -> AppResult<Vec<InventoryTransaction>>;

    /// 按时间正序
    async fn find_transactions_by_order_id(&self, order_id: &OrderId) -> AppResult<Vec<InventoryTransaction>>;
}
