//! 内存订单 Repository，用于本地开发与测试

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commercium_common::{OrderId, SellerId, UserId};
use commercium_domain_core::AggregateRoot;
use commercium_errors::AppResult;
use parking_lot::RwLock;

use crate::order::domain::{Order, OrderRepository, OrderStatus};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn select<F>(&self, predicate: F) -> Vec<Order>
    where
        F: Fn(&Order) -> bool,
    {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .values()
            .filter(|o| predicate(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> AppResult<()> {
        let mut stored = order.clone();
        // 事件由调用方负责发布
        stored.take_events();
        self.orders.write().insert(order.id, stored);
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> AppResult<Option<Order>> {
        Ok(self.orders.read().get(id).cloned())
    }

    async fn find_by_order_number(&self, order_number: &str) -> AppResult<Option<Order>> {
        Ok(self
            .orders
            .read()
            .values()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> AppResult<Vec<Order>> {
        Ok(self.select(|o| &o.user_id == user_id))
    }

    async fn find_by_user_id_and_status(
        &self,
        user_id: &UserId,
        status: OrderStatus,
    ) -> AppResult<Vec<Order>> {
        Ok(self.select(|o| &o.user_id == user_id && o.status == status))
    }

    async fn find_by_status_and_created_between(
        &self,
        status: OrderStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>> {
        Ok(self.select(|o| o.status == status && o.created_at >= from && o.created_at <= to))
    }

    async fn find_settleable_by_seller_between(
        &self,
        seller_id: &SellerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>> {
        Ok(self.select(|o| {
            o.status.is_settleable()
                && o.created_at >= from
                && o.created_at <= to
                && o.items.iter().any(|i| &i.seller_id == seller_id)
        }))
    }

    async fn find_sellers_with_sales_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<SellerId>> {
        let sellers: BTreeSet<SellerId> = self
            .select(|o| o.status.is_settleable() && o.created_at >= from && o.created_at <= to)
            .into_iter()
            .flat_map(|o| o.items.into_iter().map(|i| i.seller_id))
            .collect();
        Ok(sellers.into_iter().collect())
    }

    async fn count_by_user_id_and_status(
        &self,
        user_id: &UserId,
        status: OrderStatus,
    ) -> AppResult<i64> {
        Ok(self.select(|o| &o.user_id == user_id && o.status == status).len() as i64)
    }

    async fn delete(&self, id: &OrderId) -> AppResult<()> {
        self.orders.write().remove(id);
        Ok(())
    }
}
