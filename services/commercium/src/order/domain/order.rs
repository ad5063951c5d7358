//! 订单聚合

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use commercium_common::{OrderId, OrderItemId, ProductId, SellerId, UserId};
use commercium_domain_core::{AggregateRoot, Decimal, Entity, sum};
use commercium_errors::{AppError, AppResult};
use commercium_event_core::PendingEvents;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::events::{OrderCancelled, OrderCreated, OrderEvent, OrderLine, OrderPaid};

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Paid,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "PLACED",
            Self::Paid => "PAID",
            Self::Preparing => "PREPARING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Placed => "주문완료",
            Self::Paid => "결제완료",
            Self::Preparing => "상품준비중",
            Self::Shipped => "배송중",
            Self::Delivered => "배송완료",
            Self::Cancelled => "주문취소",
        }
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Placed | Self::Paid)
    }

    pub fn can_pay(&self) -> bool {
        matches!(self, Self::Placed)
    }

    pub fn can_ship(&self) -> bool {
        matches!(self, Self::Paid | Self::Preparing)
    }

    /// 已付款及之后的履约状态，参与结算
    pub fn is_settleable(&self) -> bool {
        matches!(
            self,
            Self::Paid | Self::Preparing | Self::Shipped | Self::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLACED" => Ok(Self::Placed),
            "PAID" => Ok(Self::Paid),
            "PREPARING" => Ok(Self::Preparing),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(AppError::validation(format!("Unknown order status: {}", other))),
        }
    }
}

/// 订单明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl OrderItem {
    pub fn create(
        product_id: ProductId,
        seller_id: SellerId,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> AppResult<Self> {
        if quantity <= 0 {
            return Err(AppError::validation("수량은 1개 이상이어야 합니다"));
        }
        if unit_price <= Decimal::ZERO {
            return Err(AppError::validation("단가는 0원보다 커야 합니다"));
        }

        Ok(Self {
            id: OrderItemId::new(),
            product_id,
            seller_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            total_price: unit_price * Decimal::from(quantity),
        })
    }

    fn line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id.clone(),
            quantity: self.quantity,
        }
    }
}

/// 配送地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub phone: String,
    pub zip_code: String,
    pub address1: String,
    pub address2: Option<String>,
}

impl ShippingAddress {
    pub fn new(
        recipient_name: impl Into<String>,
        phone: impl Into<String>,
        zip_code: impl Into<String>,
        address1: impl Into<String>,
        address2: Option<String>,
    ) -> AppResult<Self> {
        let address = Self {
            recipient_name: recipient_name.into(),
            phone: phone.into(),
            zip_code: zip_code.into(),
            address1: address1.into(),
            address2,
        };

        for (value, field) in [
            (&address.recipient_name, "수령인명"),
            (&address.phone, "연락처"),
            (&address.zip_code, "우편번호"),
            (&address.address1, "주소"),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{}은 필수입니다", field)));
            }
        }

        Ok(address)
    }

    pub fn full_address(&self) -> String {
        format!(
            "({}) {} {}",
            self.zip_code,
            self.address1,
            self.address2.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// 订单聚合根
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    events: PendingEvents<OrderEvent>,
}

impl Order {
    pub fn create(
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
    ) -> AppResult<Self> {
        if items.is_empty() {
            return Err(AppError::validation("주문 상품은 최소 1개 이상이어야 합니다"));
        }

        let now = Utc::now();
        let total_amount = sum(items.iter().map(|i| i.total_price));
        let mut order = Self {
            id: OrderId::new(),
            user_id,
            order_number: generate_order_number(now),
            status: OrderStatus::Placed,
            items,
            shipping_address,
            total_amount,
            created_at: now,
            updated_at: now,
            events: PendingEvents::default(),
        };

        order.events.record(OrderEvent::Created(OrderCreated {
            order_id: order.id,
            user_id: order.user_id.clone(),
            total_amount,
            items: order.lines(),
        }));
        Ok(order)
    }

    /// 从持久化状态重建，不产生事件
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: OrderId,
        user_id: UserId,
        order_number: String,
        status: OrderStatus,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        total_amount: Decimal,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            order_number,
            status,
            items,
            shipping_address,
            total_amount,
            created_at,
            updated_at,
            events: PendingEvents::default(),
        }
    }

    pub fn cancel(&mut self) -> AppResult<()> {
        if !self.status.can_cancel() {
            return Err(AppError::invalid_state(format!(
                "주문 상태가 {}인 경우 취소할 수 없습니다",
                self.status.description()
            )));
        }

        self.transition(OrderStatus::Cancelled);
        self.events.record(OrderEvent::Cancelled(OrderCancelled {
            order_id: self.id,
            items: self.lines(),
        }));
        Ok(())
    }

    pub fn mark_as_paid(&mut self) -> AppResult<()> {
        if !self.status.can_pay() {
            return Err(AppError::invalid_state(format!(
                "주문 상태가 {}인 경우 결제 완료 처리할 수 없습니다",
                self.status.description()
            )));
        }

        self.transition(OrderStatus::Paid);
        self.events.record(OrderEvent::Paid(OrderPaid {
            order_id: self.id,
            items: self.lines(),
        }));
        Ok(())
    }

    pub fn ship(&mut self) -> AppResult<()> {
        if !self.status.can_ship() {
            return Err(AppError::invalid_state(format!(
                "주문 상태가 {}인 경우 배송 처리할 수 없습니다",
                self.status.description()
            )));
        }

        self.transition(OrderStatus::Shipped);
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// 指定卖家的明细
    pub fn items_of_seller<'a>(&'a self, seller_id: &'a SellerId) -> impl Iterator<Item = &'a OrderItem> {
        self.items.iter().filter(move |i| &i.seller_id == seller_id)
    }

    fn transition(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    fn lines(&self) -> Vec<OrderLine> {
        self.items.iter().map(OrderItem::line).collect()
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Order {
    type Event = OrderEvent;

    fn pending_events(&mut self) -> &mut PendingEvents<Self::Event> {
        &mut self.events
    }
}

/// `ORD` + 毫秒时间戳 + 3 位随机数
fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("ORD{}{:03}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: &str, quantity: i32, price: i64) -> OrderItem {
        OrderItem::create(
            ProductId::parse(product).unwrap(),
            SellerId::parse(format!("seller-{}", product)).unwrap(),
            format!("상품명-{}", product),
            quantity,
            Decimal::from(price),
        )
        .unwrap()
    }

    fn address() -> ShippingAddress {
        ShippingAddress::new("홍길동", "010-1234-5678", "06236", "서울시 강남구", None).unwrap()
    }

    fn user() -> UserId {
        UserId::parse("user-1").unwrap()
    }

    #[test]
    fn test_create_order_totals_items_and_records_event() {
        let mut order =
            Order::create(user(), vec![item("p1", 2, 10000), item("p2", 1, 5000)], address()).unwrap();

        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.total_amount, Decimal::from(25000));
        assert!(order.order_number.starts_with("ORD"));
        assert_eq!(order.order_number.len(), 3 + 13 + 3);

        let events = order.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "OrderCreated");
        match &events[0].data {
            OrderEvent::Created(e) => {
                assert_eq!(e.total_amount, Decimal::from(25000));
                assert_eq!(e.items.len(), 2);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_create_order_requires_items() {
        let err = Order::create(user(), vec![], address()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_item_validation() {
        let product = ProductId::parse("p1").unwrap();
        let seller = SellerId::parse("s1").unwrap();
        assert!(OrderItem::create(product.clone(), seller.clone(), "x", 0, Decimal::ONE).is_err());
        assert!(OrderItem::create(product, seller, "x", 1, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_status_transitions() {
        let mut order = Order::create(user(), vec![item("p1", 1, 10000)], address()).unwrap();
        order.take_events();

        assert!(order.ship().is_err());
        order.mark_as_paid().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.mark_as_paid().is_err());

        order.ship().unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);

        let err = order.cancel().unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(order.take_events().len(), 1);
    }

    #[test]
    fn test_cancel_paid_order_records_items() {
        let mut order = Order::create(user(), vec![item("p1", 3, 10000)], address()).unwrap();
        order.mark_as_paid().unwrap();
        order.take_events();

        order.cancel().unwrap();
        let events = order.take_events();
        match &events[0].data {
            OrderEvent::Cancelled(e) => assert_eq!(e.items[0].quantity, 3),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_status_predicates() {
        assert!(OrderStatus::Placed.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(OrderStatus::Preparing.can_ship());
        assert!(!OrderStatus::Placed.can_ship());
        assert_eq!(OrderStatus::Delivered.description(), "배송완료");
        assert_eq!("CANCELLED".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_shipping_address() {
        let full = ShippingAddress::new("a", "b", "12345", "서울", Some("101호".into())).unwrap();
        assert_eq!(full.full_address(), "(12345) 서울 101호");
        assert_eq!(address().full_address(), "(06236) 서울시 강남구");

        let err = ShippingAddress::new("a", " ", "1", "x", None).unwrap_err();
        assert!(err.to_string().contains("연락처"));
    }
}
