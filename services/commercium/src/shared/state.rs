//! 应用状态

use std::sync::Arc;

use commercium_auth_core::TokenService;
use secrecy::Secret;

use crate::inventory::application::{InventoryService, StockReservationService};
use crate::order::application::OrderService;
use crate::payment::application::PaymentService;
use crate::settlement::application::{SettlementReportService, SettlementService};

/// 各 context 应用服务及安全组件
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub inventory: Arc<InventoryService>,
    pub reservations: Arc<StockReservationService>,
    pub settlements: Arc<SettlementService>,
    pub reports: Arc<SettlementReportService>,
    pub token_service: Arc<TokenService>,
    pub internal_token: Arc<Secret<String>>,
}
