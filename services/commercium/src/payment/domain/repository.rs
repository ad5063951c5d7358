//! 支付 Repository trait

use async_trait::async_trait;
use commercium_common::{OrderId, PaymentId};
use commercium_errors::AppResult;

use super::payment::{Payment, PaymentStatus};

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn save(&self, payment: &Payment) -> AppResult<()>;

    async fn find_by_id(&self, id: &PaymentId) -> AppResult<Option<Payment>>;

    /// 一个订单至多一笔支付
    async fn find_by_order_id(&self, order_id: &OrderId) -> AppResult<Option<Payment>>;

    async fn find_by_external_payment_id(&self, external_payment_id: &str) -> AppResult<Option<Payment>>;

    async fn find_by_order_ids(&self, order_ids: &[OrderId]) -> AppResult<Vec<Payment>>;

    async fn find_by_status(&self, status: PaymentStatus) -> AppResult<Vec<Payment>>;
}
