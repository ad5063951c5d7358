//! 测试替身

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commercium_common::{OrderId, OrderItemId, ProductId, SellerId};
use commercium_domain_core::Decimal;
use commercium_errors::{AppError, AppResult};
use commercium_event_core::EventDispatcher;
use commercium_ports::{DistributedLock, EventPublisher, LockToken, OutboundMessage};
use parking_lot::Mutex;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use commercium_auth_core::{Role, TokenService};
use commercium_config::{InventoryConfig, PaymentConfig};
use http_body_util::BodyExt;
use secrecy::Secret;
use tower::ServiceExt;

use crate::inventory::application::{InventoryService, StockReservationService};
use crate::inventory::domain::InventoryDomainService;
use crate::inventory::infrastructure::InMemoryInventoryRepository;
use crate::order::application::OrderService;
use crate::order::domain::{DefaultProductCatalog, OrderDomainService};
use crate::order::infrastructure::InMemoryOrderRepository;
use crate::payment::application::PaymentService;
use crate::payment::infrastructure::{InMemoryPaymentRepository, MockPaymentGateway};
use crate::settlement::application::{
    SettlementCalculationService, SettlementReportService, SettlementService,
};
use crate::settlement::domain::{CommissionRate, SaleLine, SalesSource, SettlementDomainService};
use crate::settlement::infrastructure::InMemorySettlementRepository;
use crate::shared::auth::INTERNAL_TOKEN_HEADER;
use crate::shared::router::build_router;
use crate::shared::state::AppState;

/// 记录所有已发布消息
#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.topic.clone()).collect()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, message: &OutboundMessage) -> AppResult<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

pub fn recording_dispatcher() -> (EventDispatcher, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let dispatcher = EventDispatcher::new(publisher.clone() as Arc<dyn EventPublisher>);
    (dispatcher, publisher)
}

/// 进程内锁
#[derive(Default)]
pub struct LocalLock {
    held: Mutex<HashMap<String, LockToken>>,
}

impl LocalLock {
    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains_key(key)
    }

    /// 模拟其他实例持有锁
    pub fn hold(&self, key: &str) -> LockToken {
        let token = LockToken::generate();
        self.held.lock().insert(key.to_string(), token.clone());
        token
    }
}

#[async_trait]
impl DistributedLock for LocalLock {
    async fn try_acquire(&self, key: &str, _lease: Duration) -> AppResult<Option<LockToken>> {
        let mut held = self.held.lock();
        if held.contains_key(key) {
            return Ok(None);
        }
        let token = LockToken::generate();
        held.insert(key.to_string(), token.clone());
        Ok(Some(token))
    }

    async fn release(&self, key: &str, token: &LockToken) -> AppResult<bool> {
        let mut held = self.held.lock();
        match held.get(key) {
            Some(current) if current == token => {
                held.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// 固定销售数据；`failing_seller` 的查询返回错误
#[derive(Default)]
pub struct StaticSales {
    pub sales: Vec<(SellerId, Vec<i64>)>,
    pub failing_seller: Option<SellerId>,
}

impl StaticSales {
    pub fn with(sales: &[(&str, &[i64])]) -> Self {
        Self {
            sales: sales
                .iter()
                .map(|(seller, amounts)| (SellerId::parse(*seller).unwrap(), amounts.to_vec()))
                .collect(),
            failing_seller: None,
        }
    }
}

#[async_trait]
impl SalesSource for StaticSales {
    async fn settleable_sales(
        &self,
        seller_id: &SellerId,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> AppResult<Vec<SaleLine>> {
        if self.failing_seller.as_ref() == Some(seller_id) {
            return Err(AppError::external_service("주문 서비스 응답이 없습니다"));
        }
        Ok(self
            .sales
            .iter()
            .filter(|(seller, _)| seller == seller_id)
            .flat_map(|(_, amounts)| amounts.iter())
            .map(|amount| SaleLine {
                order_id: OrderId::new(),
                order_item_id: OrderItemId::new(),
                product_id: ProductId::parse("P-1").unwrap(),
                amount: Decimal::from(*amount),
            })
            .collect())
    }

    async fn active_sellers(&self, _from: DateTime<Utc>, _to: DateTime<Utc>) -> AppResult<Vec<SellerId>> {
        Ok(self.sales.iter().map(|(seller, _)| seller.clone()).collect())
    }
}

pub fn settlement_service(sales: StaticSales) -> (SettlementService, Arc<RecordingPublisher>) {
    let repository = Arc::new(InMemorySettlementRepository::new());
    let (dispatcher, publisher) = recording_dispatcher();
    let calculation = SettlementCalculationService::new(
        repository.clone(),
        Arc::new(sales),
        SettlementDomainService::default(),
        CommissionRate::default(),
    );
    let service = SettlementService::new(
        repository,
        calculation,
        SettlementDomainService::default(),
        dispatcher,
    );
    (service, publisher)
}

pub const TEST_INTERNAL_TOKEN: &str = "internal-test-token";

/// 全内存装配的应用，用于 HTTP 层测试
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub publisher: Arc<RecordingPublisher>,
    pub report_dir: tempfile::TempDir,
}

/// HTTP 响应快照
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

impl TestApp {
    pub fn new(sales: StaticSales) -> Self {
        let (dispatcher, publisher) = recording_dispatcher();

        let orders = Arc::new(OrderService::new(
            Arc::new(InMemoryOrderRepository::new()),
            OrderDomainService::new(Arc::new(DefaultProductCatalog)),
            dispatcher.clone(),
        ));
        let payment_config = PaymentConfig::default();
        let payments = Arc::new(PaymentService::new(
            Arc::new(InMemoryPaymentRepository::new()),
            Arc::new(MockPaymentGateway::new(&payment_config)),
            dispatcher.clone(),
            payment_config.provider.clone(),
        ));

        let inventory_repository = Arc::new(InMemoryInventoryRepository::new());
        let inventory = Arc::new(InventoryService::new(
            inventory_repository.clone(),
            InventoryDomainService::default(),
            dispatcher.clone(),
        ));
        let inventory_config = InventoryConfig {
            lock_wait_secs: 0,
            ..InventoryConfig::default()
        };
        let reservations = Arc::new(StockReservationService::new(
            inventory_repository,
            Arc::new(LocalLock::default()),
            dispatcher.clone(),
            &inventory_config,
        ));

        let settlement_repository = Arc::new(InMemorySettlementRepository::new());
        let settlements = Arc::new(SettlementService::new(
            settlement_repository.clone(),
            SettlementCalculationService::new(
                settlement_repository,
                Arc::new(sales),
                SettlementDomainService::default(),
                CommissionRate::default(),
            ),
            SettlementDomainService::default(),
            dispatcher,
        ));
        let report_dir = tempfile::tempdir().unwrap();
        let reports = Arc::new(SettlementReportService::new(report_dir.path()));

        let state = AppState {
            orders,
            payments,
            inventory,
            reservations,
            settlements,
            reports,
            token_service: Arc::new(TokenService::new(
                "test-secret-key-at-least-32-bytes-long",
                3600,
                86400,
                "commercium",
                "commercium-api",
            )),
            internal_token: Arc::new(Secret::new(TEST_INTERNAL_TOKEN.to_string())),
        };
        let router = build_router(state.clone(), Duration::from_secs(5));

        Self {
            state,
            router,
            publisher,
            report_dir,
        }
    }

    pub fn token(&self, subject: &str, roles: &[Role]) -> String {
        self.state
            .token_service
            .generate_access_token(&commercium_common::UserId::parse(subject).unwrap(), roles)
            .unwrap()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let auth = token.map(|t| format!("Bearer {}", t));
        let headers: Vec<(&str, &str)> = auth
            .as_deref()
            .map(|value| vec![(header::AUTHORIZATION.as_str(), value)])
            .unwrap_or_default();
        self.send_with_headers(method, uri, &headers, body).await
    }

    /// 服务间调用，附带 `X-Internal-Token`
    pub async fn send_internal(
        &self,
        method: Method,
        uri: &str,
        internal_token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let headers: Vec<(&str, &str)> = internal_token
            .map(|value| vec![(INTERNAL_TOKEN_HEADER, value)])
            .unwrap_or_default();
        self.send_with_headers(method, uri, &headers, body).await
    }

    pub async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }
}
