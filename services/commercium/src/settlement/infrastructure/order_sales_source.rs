//! 基于订单与支付上下文的销售数据源
//!
//! 只统计已付款且存在完成支付记录的订单中属于该卖家的明细

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commercium_common::SellerId;
use commercium_errors::AppResult;
use tracing::{debug, warn};

use crate::order::application::OrderService;
use crate::payment::application::PaymentService;
use crate::settlement::domain::{SaleLine, SalesSource};

pub struct OrderSalesSource {
    orders: Arc<OrderService>,
    payments: Arc<PaymentService>,
}

impl OrderSalesSource {
    pub fn new(orders: Arc<OrderService>, payments: Arc<PaymentService>) -> Self {
        Self { orders, payments }
    }
}

#[async_trait]
impl SalesSource for OrderSalesSource {
    async fn settleable_sales(
        &self,
        seller_id: &SellerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<SaleLine>> {
        let orders = self.orders.find_paid_orders_for_seller(seller_id, from, to).await?;
        let mut lines = Vec::new();

        for order in orders {
            if self.payments.find_completed_payment(&order.id).await?.is_none() {
                warn!(order_id = %order.id, "Paid order has no completed payment, skipping");
                continue;
            }
            lines.extend(
                order
                    .items
                    .iter()
                    .filter(|item| &item.seller_id == seller_id)
                    .map(|item| SaleLine {
                        order_id: order.id,
                        order_item_id: item.id,
                        product_id: item.product_id.clone(),
                        amount: item.total_price,
                    }),
            );
        }

        debug!(seller_id = %seller_id, line_count = lines.len(), "Settleable sales collected");
        Ok(lines)
    }

    async fn active_sellers(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<Vec<SellerId>> {
        self.orders.find_active_sellers(from, to).await
    }
}
