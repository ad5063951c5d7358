//! 支付应用服务

use std::sync::Arc;

use commercium_common::{OrderId, PaymentId};
use commercium_domain_core::{AggregateRoot, Decimal};
use commercium_errors::{AppError, AppResult};
use commercium_event_core::EventDispatcher;
use tracing::{error, info, warn};

use crate::payment::domain::{
    Payment, PaymentEvent, PaymentGateway, PaymentMethod, PaymentRepository, PaymentStatus,
    PgPaymentRequest,
};
use crate::shared::events::{Route, publish_events};

/// 创建支付命令
#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// 支付事件路由，全部以订单 ID 为 key
pub fn payment_event_routes(event: &PaymentEvent) -> Vec<Route> {
    let key = event.order_id();
    let topics: &[&'static str] = match event {
        PaymentEvent::Completed(_) => &[
            "order.payment-completed",
            "inventory.decrease",
            "settlement.create",
            "notification.payment-completed",
        ],
        PaymentEvent::Failed(_) => &[
            "order.payment-failed",
            "inventory.restore",
            "notification.payment-failed",
        ],
        PaymentEvent::Cancelled(_) => &[
            "order.payment-cancelled",
            "settlement.cancel",
            "notification.payment-cancelled",
        ],
    };
    topics.iter().map(|topic| Route::new(*topic, key)).collect()
}

pub struct PaymentService {
    repository: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    dispatcher: EventDispatcher,
    provider_name: String,
}

impl PaymentService {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        dispatcher: EventDispatcher,
        provider_name: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            gateway,
            dispatcher,
            provider_name: provider_name.into(),
        }
    }

    /// 创建支付并向 PG 发起请求
    ///
    /// 实时支付方式（卡、手机）在 PG 受理成功后立即完成；其余方式等待回调
    pub async fn create_payment(&self, command: CreatePaymentCommand) -> AppResult<Payment> {
        info!(
            order_id = %command.order_id,
            method = %command.method,
            amount = %command.amount,
            "Creating payment"
        );

        if self.repository.find_by_order_id(&command.order_id).await?.is_some() {
            return Err(AppError::conflict("이미 결제가 진행 중인 주문입니다"));
        }

        let mut payment = Payment::create(
            command.order_id,
            command.method,
            command.amount,
            &self.provider_name,
        )?;
        self.repository.save(&payment).await?;

        self.process_with_gateway(&mut payment, command).await?;

        info!(payment_id = %payment.id, status = %payment.status, "Payment created");
        Ok(payment)
    }

    async fn process_with_gateway(
        &self,
        payment: &mut Payment,
        command: CreatePaymentCommand,
    ) -> AppResult<()> {
        let request = PgPaymentRequest {
            order_name: format!("주문 {}", payment.order_id),
            order_id: payment.order_id,
            amount: payment.amount.total,
            payment_method: payment.method,
            customer_name: command.customer_name,
            customer_email: command.customer_email,
            return_url: command.return_url,
            cancel_url: command.cancel_url,
        };

        let response = match self.gateway.request_payment(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(payment_id = %payment.id, error = %e, "PG payment request failed");
                let reason = format!("PG사 통신 오류: {}", e.client_message());
                payment.fail(reason.clone())?;
                self.save_and_publish(payment).await?;
                return Err(AppError::external_service(reason));
            }
        };

        payment.start_processing(
            response.payment_key.clone(),
            response.transaction_id.clone().unwrap_or_default(),
        )?;

        if response.is_failed() {
            warn!(payment_id = %payment.id, reason = %response.failure_reason(), "PG declined payment");
            payment.fail(response.failure_reason())?;
            commercium_telemetry::metrics::record_business_event("payment", "failed");
        } else if response.is_success() && payment.method.is_real_time() {
            payment.complete(response.amount)?;
            commercium_telemetry::metrics::record_business_event("payment", "completed");
        }

        self.save_and_publish(payment).await?;
        info!(
            payment_id = %payment.id,
            external_payment_id = %response.payment_key,
            "PG payment processed"
        );
        Ok(())
    }

    pub async fn get_payment(&self, payment_id: &PaymentId) -> AppResult<Payment> {
        self.repository
            .find_by_id(payment_id)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn get_payment_by_order(&self, order_id: &OrderId) -> AppResult<Payment> {
        self.repository
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn cancel_payment(
        &self,
        payment_id: &PaymentId,
        amount: Decimal,
        reason: &str,
    ) -> AppResult<Payment> {
        info!(payment_id = %payment_id, amount = %amount, reason, "Cancelling payment");

        let mut payment = self.get_payment(payment_id).await?;
        if !payment.can_cancel() {
            return Err(AppError::business_rule("취소할 수 없는 결제입니다"));
        }

        let payment_key = payment
            .provider
            .external_payment_id
            .clone()
            .ok_or_else(|| AppError::invalid_state("PG 결제 키가 없는 결제입니다"))?;
        self.gateway
            .cancel_payment(&payment_key, amount, reason)
            .await
            .inspect_err(|e| error!(payment_id = %payment_id, error = %e, "PG cancel failed"))?;

        payment.cancel(amount, reason)?;
        self.save_and_publish(&mut payment).await?;

        commercium_telemetry::metrics::record_business_event("payment", "cancelled");
        info!(payment_id = %payment_id, status = %payment.status, "Payment cancelled");
        Ok(payment)
    }

    /// PG 回调：支付完成
    pub async fn complete_payment(&self, external_payment_id: &str, paid: Decimal) -> AppResult<Payment> {
        info!(external_payment_id, paid = %paid, "Completing payment from callback");

        let mut payment = self.find_by_external_id(external_payment_id).await?;
        payment.complete(paid)?;
        self.save_and_publish(&mut payment).await?;

        commercium_telemetry::metrics::record_business_event("payment", "completed");
        info!(payment_id = %payment.id, "Payment completed");
        Ok(payment)
    }

    /// PG 回调：支付失败
    pub async fn fail_payment(&self, external_payment_id: &str, reason: &str) -> AppResult<Payment> {
        info!(external_payment_id, reason, "Failing payment from callback");

        let mut payment = self.find_by_external_id(external_payment_id).await?;
        payment.fail(reason)?;
        self.save_and_publish(&mut payment).await?;

        commercium_telemetry::metrics::record_business_event("payment", "failed");
        info!(payment_id = %payment.id, "Payment failed");
        Ok(payment)
    }

    pub async fn get_payments_by_orders(&self, order_ids: &[OrderId]) -> AppResult<Vec<Payment>> {
        self.repository.find_by_order_ids(order_ids).await
    }

    /// 已完成的支付（结算用）
    pub async fn find_completed_payment(&self, order_id: &OrderId) -> AppResult<Option<Payment>> {
        Ok(self
            .repository
            .find_by_order_id(order_id)
            .await?
            .filter(|p| p.status == PaymentStatus::Completed))
    }

    async fn find_by_external_id(&self, external_payment_id: &str) -> AppResult<Payment> {
        self.repository
            .find_by_external_payment_id(external_payment_id)
            .await?
            .ok_or_else(not_found)
    }

    async fn save_and_publish(&self, payment: &mut Payment) -> AppResult<()> {
        self.repository.save(payment).await?;
        publish_events(&self.dispatcher, payment.take_events(), payment_event_routes).await;
        Ok(())
    }
}

fn not_found() -> AppError {
    AppError::not_found("결제 정보를 찾을 수 없습니다")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::domain::{PG_STATUS_COMPLETED, PG_STATUS_FAILED, PgCancelResponse, PgPaymentResponse};
    use crate::payment::infrastructure::InMemoryPaymentRepository;
    use crate::shared::testing::{RecordingPublisher, recording_dispatcher};
    use async_trait::async_trait;
    use chrono::Utc;

    mockall::mock! {
        pub Gateway {}

        #[async_trait]
        impl PaymentGateway for Gateway {
            async fn request_payment(&self, request: PgPaymentRequest) -> AppResult<PgPaymentResponse>;
            async fn cancel_payment(&self, payment_key: &str, amount: Decimal, reason: &str) -> AppResult<PgCancelResponse>;
            async fn get_payment(&self, payment_key: &str) -> AppResult<PgPaymentResponse>;
        }
    }

    fn response(status: &str, amount: Decimal) -> PgPaymentResponse {
        let failed = status == PG_STATUS_FAILED;
        PgPaymentResponse {
            payment_key: "mock_payment_test".to_string(),
            transaction_id: Some("mock_tx_1".to_string()),
            order_id: None,
            amount,
            status: status.to_string(),
            approved_at: None,
            failure_code: failed.then(|| "INSUFFICIENT_BALANCE".to_string()),
            failure_message: failed.then(|| "잔액 부족".to_string()),
        }
    }

    fn service(gateway: MockGateway) -> (PaymentService, Arc<RecordingPublisher>) {
        let (dispatcher, publisher) = recording_dispatcher();
        let service = PaymentService::new(
            Arc::new(InMemoryPaymentRepository::new()),
            Arc::new(gateway),
            dispatcher,
            "MOCK_PG",
        );
        (service, publisher)
    }

    fn command(method: PaymentMethod) -> CreatePaymentCommand {
        CreatePaymentCommand {
            order_id: OrderId::new(),
            method,
            amount: Decimal::from(20_000),
            customer_name: Some("홍길동".to_string()),
            customer_email: None,
            return_url: None,
            cancel_url: None,
        }
    }

    #[tokio::test]
    async fn test_card_payment_completes_immediately() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request_payment()
            .withf(|req| req.order_name.starts_with("주문 ") && req.amount == Decimal::from(20_000))
            .times(1)
            .returning(|req| Ok(response(PG_STATUS_COMPLETED, req.amount)));
        let (service, publisher) = service(gateway);

        let payment = service.create_payment(command(PaymentMethod::Card)).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.provider.external_payment_id.as_deref(), Some("mock_payment_test"));
        assert_eq!(
            publisher.topics(),
            vec![
                "order.payment-completed",
                "inventory.decrease",
                "settlement.create",
                "notification.payment-completed"
            ]
        );
        assert!(publisher.messages().iter().all(|m| m.key == payment.order_id.to_string()));
    }

    #[tokio::test]
    async fn test_virtual_account_waits_for_callback() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request_payment()
            .returning(|req| Ok(response(PG_STATUS_COMPLETED, req.amount)));
        let (service, publisher) = service(gateway);

        let payment = service
            .create_payment(command(PaymentMethod::VirtualAccount))
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Processing);
        assert!(publisher.messages().is_empty());

        let completed = service
            .complete_payment("mock_payment_test", Decimal::from(20_000))
            .await
            .unwrap();
        assert_eq!(completed.status, PaymentStatus::Completed);
        assert_eq!(publisher.on_topic("order.payment-completed").len(), 1);
    }

    #[tokio::test]
    async fn test_declined_payment_is_failed_with_pg_message() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request_payment()
            .returning(|req| Ok(response(PG_STATUS_FAILED, req.amount)));
        let (service, publisher) = service(gateway);

        let payment = service.create_payment(command(PaymentMethod::Mobile)).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failed_reason.as_deref(), Some("[INSUFFICIENT_BALANCE] 잔액 부족"));
        assert_eq!(
            publisher.topics(),
            vec!["order.payment-failed", "inventory.restore", "notification.payment-failed"]
        );
    }

    #[tokio::test]
    async fn test_gateway_error_fails_payment_and_propagates() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request_payment()
            .returning(|_| Err(AppError::external_service("connection reset")));
        let (service, _) = service(gateway);
        let cmd = command(PaymentMethod::Card);
        let order_id = cmd.order_id;

        let err = service.create_payment(cmd).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));

        let stored = service.get_payment_by_order(&order_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(stored.failed_reason.as_deref(), Some("PG사 통신 오류: connection reset"));
    }

    #[tokio::test]
    async fn test_second_payment_for_order_conflicts() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request_payment()
            .times(1)
            .returning(|req| Ok(response(PG_STATUS_COMPLETED, req.amount)));
        let (service, _) = service(gateway);
        let cmd = command(PaymentMethod::Card);

        service.create_payment(cmd.clone()).await.unwrap();
        let err = service.create_payment(cmd).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancel_goes_through_gateway() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request_payment()
            .returning(|req| Ok(response(PG_STATUS_COMPLETED, req.amount)));
        gateway
            .expect_cancel_payment()
            .withf(|key, amount, reason| {
                key == "mock_payment_test" && *amount == Decimal::from(5_000) && reason == "고객 요청"
            })
            .times(1)
            .returning(|key, amount, _| {
                Ok(PgCancelResponse {
                    payment_key: key.to_string(),
                    cancelled_amount: amount,
                    cancelled_at: Utc::now(),
                })
            });
        let (service, publisher) = service(gateway);
        let payment = service.create_payment(command(PaymentMethod::Card)).await.unwrap();
        publisher.clear();

        let cancelled = service
            .cancel_payment(&payment.id, Decimal::from(5_000), "고객 요청")
            .await
            .unwrap();
        assert_eq!(cancelled.status, PaymentStatus::PartialCancelled);
        assert_eq!(cancelled.amount.refundable(), Decimal::from(15_000));
        assert_eq!(
            publisher.topics(),
            vec!["order.payment-cancelled", "settlement.cancel", "notification.payment-cancelled"]
        );

        let err = service
            .cancel_payment(&payment.id, Decimal::from(1_000), "고객 요청")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn test_unknown_callback_key_is_not_found() {
        let (service, _) = service(MockGateway::new());
        let err = service.fail_payment("missing", "[E] x").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
