//! 订单 Repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commercium_common::{OrderId, SellerId, UserId};
use commercium_errors::AppResult;

use super::order::{Order, OrderStatus};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 保存订单及明细（新增或更新）
    async fn save(&self, order: &Order) -> AppResult<()>;

    async fn find_by_id(&self, id: &OrderId) -> AppResult<Option<Order>>;

    async fn find_by_order_number(&self, order_number: &str) -> AppResult<Option<Order>>;

    /// 按创建时间倒序
    async fn find_by_user_id(&self, user_id: &UserId) -> AppResult<Vec<Order>>;

    async fn find_by_user_id_and_status(
        &self,
        user_id: &UserId,
        status: OrderStatus,
    ) -> AppResult<Vec<Order>>;

    async fn find_by_status_and_created_between(
        &self,
        status: OrderStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>>;

    /// 区间内含该卖家商品且已付款（及之后状态）的订单
    async fn find_settleable_by_seller_between(
        &self,
        seller_id: &SellerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>>;

    /// 区间内有已付款订单的卖家
    async fn find_sellers_with_sales_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<SellerId>>;

    async fn count_by_user_id_and_status(
        &self,
        user_id: &UserId,
        status: OrderStatus,
    ) -> AppResult<i64>;

    async fn delete(&self, id: &OrderId) -> AppResult<()>;
}
