//! 订单应用服务

use std::sync::Arc;

use chrono::{DateTime, Utc};
use commercium_common::{OrderId, SellerId, UserId};
use commercium_domain_core::AggregateRoot;
use commercium_errors::{AppError, AppResult};
use commercium_event_core::EventDispatcher;
use tracing::info;

use crate::order::domain::{
    Order, OrderDomainService, OrderEvent, OrderLineRequest, OrderRepository, OrderStatus,
    ShippingAddress,
};
use crate::shared::events::{Route, publish_events};

/// 创建订单命令
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: ShippingAddress,
}

/// 订单事件路由
pub fn order_event_routes(event: &OrderEvent) -> Vec<Route> {
    match event {
        OrderEvent::Created(e) => vec![
            Route::new("inventory.reserve", e.order_id),
            Route::new("notification.order-created", &e.user_id),
        ],
        OrderEvent::Cancelled(e) => vec![
            Route::new("inventory.restore", e.order_id),
            Route::new("payment.cancel", e.order_id),
            Route::new("notification.order-cancelled", e.order_id),
        ],
        OrderEvent::Paid(e) => vec![
            Route::new("settlement.create", e.order_id),
            Route::new("shipping.prepare", e.order_id),
            Route::new("notification.payment-completed", e.order_id),
        ],
    }
}

/// 订单应用服务
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    domain_service: OrderDomainService,
    dispatcher: EventDispatcher,
}

impl OrderService {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        domain_service: OrderDomainService,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            repository,
            domain_service,
            dispatcher,
        }
    }

    pub async fn create_order(&self, user_id: &UserId, command: CreateOrderCommand) -> AppResult<Order> {
        info!(user_id = %user_id, item_count = command.items.len(), "Creating order");

        let items = self.domain_service.create_order_items(&command.items).await?;
        let mut order = Order::create(user_id.clone(), items, command.shipping_address)?;
        self.save_and_publish(&mut order).await?;

        commercium_telemetry::metrics::record_business_event("order", "created");
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_amount = %order.total_amount,
            "Order created"
        );
        Ok(order)
    }

    pub async fn cancel_order(&self, user_id: &UserId, order_id: &OrderId) -> AppResult<Order> {
        info!(user_id = %user_id, order_id = %order_id, "Cancelling order");

        let mut order = self.find_owned(user_id, order_id).await?;
        order.cancel()?;
        self.save_and_publish(&mut order).await?;

        commercium_telemetry::metrics::record_business_event("order", "cancelled");
        info!(order_id = %order_id, "Order cancelled");
        Ok(order)
    }

    pub async fn confirm_payment(&self, order_id: &OrderId) -> AppResult<Order> {
        info!(order_id = %order_id, "Confirming order payment");

        let mut order = self.find(order_id).await?;
        order.mark_as_paid()?;
        self.save_and_publish(&mut order).await?;

        commercium_telemetry::metrics::record_business_event("order", "paid");
        info!(order_id = %order_id, "Order payment confirmed");
        Ok(order)
    }

    /// 支付完成消息可能重复投递，已付款的订单直接跳过
    pub async fn confirm_payment_if_placed(&self, order_id: &OrderId) -> AppResult<bool> {
        let order = self.find(order_id).await?;
        if order.status != OrderStatus::Placed {
            info!(
                order_id = %order_id,
                status = %order.status,
                "Order is not awaiting payment, skipping confirmation"
            );
            return Ok(false);
        }
        self.confirm_payment(order_id).await?;
        Ok(true)
    }

    pub async fn get_user_orders(&self, user_id: &UserId) -> AppResult<Vec<Order>> {
        self.repository.find_by_user_id(user_id).await
    }

    pub async fn get_order(&self, user_id: &UserId, order_id: &OrderId) -> AppResult<Order> {
        self.find_owned(user_id, order_id).await
    }

    /// 结算用：区间内含该卖家商品的已付款订单
    pub async fn find_paid_orders_for_seller(
        &self,
        seller_id: &SellerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>> {
        self.repository
            .find_settleable_by_seller_between(seller_id, from, to)
            .await
    }

    pub async fn find_active_sellers(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<SellerId>> {
        self.repository.find_sellers_with_sales_between(from, to).await
    }

    async fn find(&self, order_id: &OrderId) -> AppResult<Order> {
        self.repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("주문을 찾을 수 없습니다"))
    }

    async fn find_owned(&self, user_id: &UserId, order_id: &OrderId) -> AppResult<Order> {
        let order = self.find(order_id).await?;
        if !order.is_owned_by(user_id) {
            return Err(AppError::forbidden("주문에 접근할 권한이 없습니다"));
        }
        Ok(order)
    }

    async fn save_and_publish(&self, order: &mut Order) -> AppResult<()> {
        self.repository.save(order).await?;
        publish_events(&self.dispatcher, order.take_events(), order_event_routes).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::domain::DefaultProductCatalog;
    use crate::order::infrastructure::InMemoryOrderRepository;
    use crate::shared::testing::{RecordingPublisher, recording_dispatcher};
    use commercium_common::ProductId;
    use commercium_domain_core::Decimal;

    fn service() -> (OrderService, Arc<RecordingPublisher>) {
        let (dispatcher, publisher) = recording_dispatcher();
        let service = OrderService::new(
            Arc::new(InMemoryOrderRepository::new()),
            OrderDomainService::new(Arc::new(DefaultProductCatalog)),
            dispatcher,
        );
        (service, publisher)
    }

    fn command(lines: &[(&str, i32)]) -> CreateOrderCommand {
        CreateOrderCommand {
            items: lines
                .iter()
                .map(|(pid, qty)| OrderLineRequest {
                    product_id: ProductId::parse(*pid).unwrap(),
                    quantity: *qty,
                })
                .collect(),
            shipping_address: ShippingAddress::new("홍길동", "010-1234-5678", "06236", "서울시 강남구", None)
                .unwrap(),
        }
    }

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_create_order_publishes_reserve_and_notification() {
        let (service, publisher) = service();
        let order = service
            .create_order(&user("user-1"), command(&[("P-1", 2), ("P-2", 1)]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.total_amount, Decimal::from(30000));
        assert_eq!(
            publisher.topics(),
            vec!["inventory.reserve", "notification.order-created"]
        );

        let reserve = &publisher.on_topic("inventory.reserve")[0];
        assert_eq!(reserve.key, order.id.to_string());
        let json: serde_json::Value = serde_json::from_str(&reserve.payload).unwrap();
        assert_eq!(json["event_type"], "OrderCreated");
        assert_eq!(json["data"]["items"][0]["productId"], "P-1");
        assert_eq!(json["data"]["items"][0]["quantity"], 2);

        let notification = &publisher.on_topic("notification.order-created")[0];
        assert_eq!(notification.key, "user-1");
    }

    #[tokio::test]
    async fn test_quantity_limit_rejects_before_saving() {
        let (service, publisher) = service();
        let err = service
            .create_order(&user("user-1"), command(&[("P-1", 11)]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(publisher.messages().is_empty());
        assert!(service.get_user_orders(&user("user-1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_owner_can_cancel() {
        let (service, publisher) = service();
        let order = service
            .create_order(&user("user-1"), command(&[("P-1", 1)]))
            .await
            .unwrap();
        publisher.clear();

        let err = service.cancel_order(&user("intruder"), &order.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let cancelled = service.cancel_order(&user("user-1"), &order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(
            publisher.topics(),
            vec!["inventory.restore", "payment.cancel", "notification.order-cancelled"]
        );
    }

    #[tokio::test]
    async fn test_confirm_payment_is_idempotent_for_consumers() {
        let (service, publisher) = service();
        let order = service
            .create_order(&user("user-1"), command(&[("P-1", 1)]))
            .await
            .unwrap();
        publisher.clear();

        assert!(service.confirm_payment_if_placed(&order.id).await.unwrap());
        assert!(!service.confirm_payment_if_placed(&order.id).await.unwrap());
        assert_eq!(publisher.on_topic("settlement.create").len(), 1);

        let err = service.confirm_payment(&order.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (service, _) = service();
        let err = service.confirm_payment(&OrderId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_paid_orders_visible_to_seller_settlement() {
        let (service, _) = service();
        let from = Utc::now() - chrono::Duration::hours(1);
        let paid = service
            .create_order(&user("user-1"), command(&[("P-1", 1)]))
            .await
            .unwrap();
        service
            .create_order(&user("user-1"), command(&[("P-1", 1)]))
            .await
            .unwrap();
        service.confirm_payment(&paid.id).await.unwrap();
        let to = Utc::now() + chrono::Duration::hours(1);

        let seller = SellerId::parse("seller-P-1").unwrap();
        let orders = service.find_paid_orders_for_seller(&seller, from, to).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, paid.id);
        assert_eq!(service.find_active_sellers(from, to).await.unwrap(), vec![seller]);
    }
}
