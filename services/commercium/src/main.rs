//! Commercium 服务入口
//!
//! 装配仓储、应用服务、Kafka 消费者与结算调度器

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use commercium::inventory::application::{InventoryService, StockReservationService};
use commercium::inventory::domain::InventoryDomainService;
use commercium::inventory::infrastructure::{
    INVENTORY_CONSUMER_GROUP, InventoryOrderEventHandler, PostgresInventoryRepository,
};
use commercium::order::application::OrderService;
use commercium::order::domain::{DefaultProductCatalog, OrderDomainService};
use commercium::order::infrastructure::{
    ORDER_CONSUMER_GROUP, OrderPaymentEventHandler, PostgresOrderRepository,
};
use commercium::payment::application::PaymentService;
use commercium::payment::infrastructure::{MockPaymentGateway, PostgresPaymentRepository};
use commercium::settlement::application::{
    SettlementCalculationService, SettlementReportService, SettlementService,
};
use commercium::settlement::domain::{CommissionRate, SalesSource, SettlementDomainService};
use commercium::settlement::infrastructure::{
    OrderSalesSource, PostgresSettlementRepository, SETTLEMENT_CONSUMER_GROUP,
    SettlementTriggerHandler,
};
use commercium::settlement::jobs::{DailySettlementJob, SettlementScheduler, WeeklySettlementJob};
use commercium::shared::AppState;
use commercium::shared::router::build_router;
use commercium_adapter_kafka::{KafkaConsumerConfig, KafkaEventConsumer};
use commercium_bootstrap::{Infrastructure, ShutdownController};
use commercium_errors::{AppError, AppResult};
use commercium_event_core::{EventDispatcher, MessageHandler};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    commercium_bootstrap::run("config", |infra, shutdown| async move {
        if infra.config().database.run_migrations {
            sqlx::migrate!("../../migrations")
                .run(&infra.postgres_pool())
                .await
                .map_err(|e| AppError::database(format!("Failed to run migrations: {}", e)))?;
            info!("Database migrations applied");
        }

        let state = build_state(&infra, &shutdown)?;
        let timeout = Duration::from_secs(infra.config().server.request_timeout_secs);
        Ok(build_router(state, timeout))
    })
    .await?;
    Ok(())
}

fn build_state(infra: &Infrastructure, shutdown: &ShutdownController) -> AppResult<AppState> {
    let config = infra.config();
    let pool = infra.postgres_pool();
    let dispatcher = EventDispatcher::new(infra.event_publisher());

    let orders = Arc::new(OrderService::new(
        Arc::new(PostgresOrderRepository::new(pool.clone())),
        OrderDomainService::new(Arc::new(DefaultProductCatalog)),
        dispatcher.clone(),
    ));
    let payments = Arc::new(PaymentService::new(
        Arc::new(PostgresPaymentRepository::new(pool.clone())),
        Arc::new(MockPaymentGateway::new(&config.payment)),
        dispatcher.clone(),
        config.payment.provider.clone(),
    ));

    let inventory_repository = Arc::new(PostgresInventoryRepository::new(pool.clone()));
    let inventory = Arc::new(InventoryService::new(
        inventory_repository.clone(),
        InventoryDomainService::new(config.inventory.low_stock_threshold),
        dispatcher.clone(),
    ));
    let reservations = Arc::new(StockReservationService::new(
        inventory_repository,
        infra.distributed_lock(),
        dispatcher.clone(),
        &config.inventory,
    ));

    let settlement_repository = Arc::new(PostgresSettlementRepository::new(pool));
    let sales: Arc<dyn SalesSource> = Arc::new(OrderSalesSource::new(orders.clone(), payments.clone()));
    let commission_rate = CommissionRate::of(config.settlement.default_commission_rate)?;
    let settlements = Arc::new(SettlementService::new(
        settlement_repository.clone(),
        SettlementCalculationService::new(
            settlement_repository,
            sales.clone(),
            SettlementDomainService::new(&config.settlement),
            commission_rate,
        ),
        SettlementDomainService::new(&config.settlement),
        dispatcher,
    ));
    let reports = Arc::new(SettlementReportService::new(Path::new(&config.settlement.report_dir)));

    let handlers: Vec<(&'static str, Arc<dyn MessageHandler>)> = vec![
        (ORDER_CONSUMER_GROUP, Arc::new(OrderPaymentEventHandler::new(orders.clone()))),
        (
            INVENTORY_CONSUMER_GROUP,
            Arc::new(InventoryOrderEventHandler::new(reservations.clone())),
        ),
        (SETTLEMENT_CONSUMER_GROUP, Arc::new(SettlementTriggerHandler)),
    ];
    start_consumers(infra, shutdown, handlers)?;

    if config.scheduler.enabled {
        let scheduler = SettlementScheduler::new(
            DailySettlementJob::new(settlements.clone(), reports.clone()),
            WeeklySettlementJob::new(settlements.clone(), reports.clone(), sales),
            settlements.clone(),
        );
        shutdown.spawn(scheduler.run(shutdown.token()));
    } else {
        info!("Settlement scheduler is disabled");
    }

    Ok(AppState {
        orders,
        payments,
        inventory,
        reservations,
        settlements,
        reports,
        token_service: infra.token_service(),
        internal_token: Arc::new(config.security.internal_token.clone()),
    })
}

fn start_consumers(
    infra: &Infrastructure,
    shutdown: &ShutdownController,
    handlers: Vec<(&'static str, Arc<dyn MessageHandler>)>,
) -> AppResult<()> {
    let Some(kafka) = &infra.config().kafka else {
        warn!("Kafka is not configured, consumers are not started");
        return Ok(());
    };
    if !kafka.consumers_enabled {
        info!("Kafka consumers are disabled");
        return Ok(());
    }

    for (group, handler) in handlers {
        let group_id = format!("{}{}", kafka.consumer_group_prefix, group);
        let consumer = KafkaEventConsumer::new(KafkaConsumerConfig::new(&kafka.brokers, &group_id), handler)?;
        let token = shutdown.token();
        shutdown.spawn(async move {
            if let Err(e) = consumer.run(token).await {
                error!(group_id = %consumer.group_id(), error = %e, "Kafka consumer stopped with error");
            }
        });
        info!(group_id = %group_id, "Kafka consumer started");
    }
    Ok(())
}
