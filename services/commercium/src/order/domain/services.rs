//! 订单领域服务

use std::sync::Arc;

use async_trait::async_trait;
use commercium_common::{ProductId, SellerId};
use commercium_domain_core::Decimal;
use commercium_errors::{AppError, AppResult};
use tracing::debug;

use super::order::OrderItem;

/// 单个商品行的最大购买数量
pub const MAX_QUANTITY_PER_PRODUCT: i32 = 10;

/// 商品信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub name: String,
    pub unit_price: Decimal,
}

/// 商品目录端口
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product(&self, product_id: &ProductId) -> AppResult<ProductInfo>;
}

/// 没有商品服务时使用的固定目录
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProductCatalog;

#[async_trait]
impl ProductCatalog for DefaultProductCatalog {
    async fn find_product(&self, product_id: &ProductId) -> AppResult<ProductInfo> {
        let seller_id = SellerId::parse(format!("seller-{}", product_id)).map_err(AppError::validation)?;
        Ok(ProductInfo {
            product_id: product_id.clone(),
            seller_id,
            name: format!("상품명-{}", product_id),
            unit_price: Decimal::from(10_000),
        })
    }
}

/// 订单商品行请求
#[derive(Debug, Clone)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// 订单领域服务
#[derive(Clone)]
pub struct OrderDomainService {
    catalog: Arc<dyn ProductCatalog>,
}

impl OrderDomainService {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { catalog }
    }

    /// 校验购买数量并按目录价格生成明细
    pub async fn create_order_items(&self, lines: &[OrderLineRequest]) -> AppResult<Vec<OrderItem>> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            Self::validate_quantity(&line.product_id, line.quantity)?;

            let product = self.catalog.find_product(&line.product_id).await?;
            items.push(OrderItem::create(
                product.product_id,
                product.seller_id,
                product.name,
                line.quantity,
                product.unit_price,
            )?);
        }
        Ok(items)
    }

    fn validate_quantity(product_id: &ProductId, quantity: i32) -> AppResult<()> {
        if quantity > MAX_QUANTITY_PER_PRODUCT {
            return Err(AppError::business_rule(format!(
                "상품 {}는 최대 {}개까지만 주문 가능합니다",
                product_id, MAX_QUANTITY_PER_PRODUCT
            )));
        }
        debug!(product_id = %product_id, quantity, "Product quantity accepted");
        Ok(())
    }
}
