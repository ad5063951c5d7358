//! 订单 API 请求/响应体

use chrono::{DateTime, Utc};
use commercium_common::ProductId;
use commercium_domain_core::Decimal;
use commercium_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::order::application::CreateOrderCommand;
use crate::order::domain::{Order, OrderItem, OrderLineRequest, ShippingAddress};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[validate(length(min = 1, message = "상품 ID는 필수입니다"))]
    pub product_id: String,
    #[validate(range(min = 1, message = "수량은 1 이상이어야 합니다"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressRequest {
    #[validate(length(min = 1, message = "수령인명은 필수입니다"))]
    pub recipient_name: String,
    #[validate(length(min = 1, message = "연락처는 필수입니다"))]
    pub phone: String,
    #[validate(length(min = 1, message = "우편번호는 필수입니다"))]
    pub zip_code: String,
    #[validate(length(min = 1, message = "주소는 필수입니다"))]
    pub address1: String,
    pub address2: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "주문 상품은 최소 1개 이상이어야 합니다"), nested)]
    pub items: Vec<OrderItemRequest>,
    #[validate(nested)]
    pub shipping_address: ShippingAddressRequest,
}

impl CreateOrderRequest {
    pub fn into_command(self) -> AppResult<CreateOrderCommand> {
        let items = self
            .items
            .into_iter()
            .map(|item| {
                Ok(OrderLineRequest {
                    product_id: ProductId::parse(item.product_id).map_err(AppError::validation)?,
                    quantity: item.quantity,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let address = self.shipping_address;
        let shipping_address = ShippingAddress::new(
            address.recipient_name,
            address.phone,
            address.zip_code,
            address.address1,
            address.address2,
        )?;

        Ok(CreateOrderCommand {
            items,
            shipping_address,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub seller_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product_id.to_string(),
            seller_id: item.seller_id.to_string(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressResponse {
    pub recipient_name: String,
    pub phone: String,
    pub zip_code: String,
    pub address1: String,
    pub address2: Option<String>,
    pub full_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub status: String,
    pub status_description: String,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: ShippingAddressResponse,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let address = &order.shipping_address;
        Self {
            id: order.id.to_string(),
            order_number: order.order_number.clone(),
            user_id: order.user_id.to_string(),
            status: order.status.as_str().to_string(),
            status_description: order.status.description().to_string(),
            items: order.items.iter().map(OrderItemResponse::from).collect(),
            shipping_address: ShippingAddressResponse {
                recipient_name: address.recipient_name.clone(),
                phone: address.phone.clone(),
                zip_code: address.zip_code.clone(),
                address1: address.address1.clone(),
                address2: address.address2.clone(),
                full_address: address.full_address(),
            },
            total_amount: order.total_amount,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(items: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(serde_json::json!({
            "items": items,
            "shippingAddress": {
                "recipientName": "홍길동",
                "phone": "010-1234-5678",
                "zipCode": "06236",
                "address1": "서울시 강남구 테헤란로 123"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_items_rejected() {
        let req = request(serde_json::json!([]));
        let err = AppError::from(req.validate().unwrap_err());
        assert!(err.to_string().contains("items"));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let req = request(serde_json::json!([{ "productId": "P-1", "quantity": 0 }]));
        let err = AppError::from(req.validate().unwrap_err());
        assert!(err.to_string().contains("items[0].quantity: 수량은 1 이상이어야 합니다"));
    }

    #[test]
    fn test_into_command() {
        let req = request(serde_json::json!([{ "productId": "P-1", "quantity": 2 }]));
        req.validate().unwrap();
        let command = req.into_command().unwrap();
        assert_eq!(command.items.len(), 1);
        assert_eq!(command.items[0].product_id.as_str(), "P-1");
        assert_eq!(command.shipping_address.address2, None);
    }
}
