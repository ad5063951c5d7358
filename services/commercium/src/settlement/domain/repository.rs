//! 结算 Repository 与销售数据来源

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use commercium_common::{OrderId, OrderItemId, ProductId, SellerId, SettlementId};
use commercium_domain_core::Decimal;
use commercium_errors::AppResult;

use super::settlement::Settlement;
use super::values::SettlementStatus;

#[async_trait]
pub trait SettlementRepository: Send + Sync {
    /// 结算与明细一并保存
    async fn save(&self, settlement: &Settlement) -> AppResult<()>;

    async fn find_by_id(&self, id: &SettlementId) -> AppResult<Option<Settlement>>;

    /// 按结算日倒序
    async fn find_by_seller_id(&self, seller_id: &SellerId) -> AppResult<Vec<Settlement>>;

    async fn find_by_seller_id_and_settlement_date_between(
        &self,
        seller_id: &SellerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Settlement>>;

    async fn find_by_settlement_date_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Settlement>>;

    async fn find_by_status(&self, status: SettlementStatus) -> AppResult<Vec<Settlement>>;

    async fn count_by_status(&self, status: SettlementStatus) -> AppResult<i64>;

    async fn exists_by_seller_id_and_period(
        &self,
        seller_id: &SellerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<bool>;
}

/// 一条可结算的销售记录（卖家的一个已付款订单明细）
#[derive(Debug, Clone, PartialEq)]
pub struct SaleLine {
    pub order_id: OrderId,
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub amount: Decimal,
}

/// 结算所需的销售数据
#[async_trait]
pub trait SalesSource: Send + Sync {
    async fn settleable_sales(
        &self,
        seller_id: &SellerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<SaleLine>>;

    /// 区间内有销售的卖家
    async fn active_sellers(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<Vec<SellerId>>;
}
