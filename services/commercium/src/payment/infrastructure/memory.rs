//! 内存支付 Repository

use std::collections::HashMap;

use async_trait::async_trait;
use commercium_common::{OrderId, PaymentId};
use commercium_domain_core::AggregateRoot;
use commercium_errors::AppResult;
use parking_lot::RwLock;

use crate::payment::domain::{Payment, PaymentRepository, PaymentStatus};

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_first<F: Fn(&Payment) -> bool>(&self, predicate: F) -> Option<Payment> {
        self.payments.read().values().find(|p| predicate(p)).cloned()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: &Payment) -> AppResult<()> {
        let mut stored = payment.clone();
        stored.take_events();
        self.payments.write().insert(payment.id, stored);
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> AppResult<Option<Payment>> {
        Ok(self.payments.read().get(id).cloned())
    }

    async fn find_by_order_id(&self, order_id: &OrderId) -> AppResult<Option<Payment>> {
        Ok(self.find_first(|p| &p.order_id == order_id))
    }

    async fn find_by_external_payment_id(&self, external_payment_id: &str) -> AppResult<Option<Payment>> {
        Ok(self.find_first(|p| p.provider.external_payment_id.as_deref() == Some(external_payment_id)))
    }

    async fn find_by_order_ids(&self, order_ids: &[OrderId]) -> AppResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .read()
            .values()
            .filter(|p| order_ids.contains(&p.order_id))
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn find_by_status(&self, status: PaymentStatus) -> AppResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .read()
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}
