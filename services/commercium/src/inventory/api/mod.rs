//! 库存 REST 接口 `/api/inventory`
//!
//! - 查询库存需登录
//! - 建档、入库、查看流水需 ADMIN 或 SELLER，调整需 ADMIN
//! - 预占、释放、扣减只接受服务间调用（`X-Internal-Token`）

mod dto;
mod handlers;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub use dto::*;

use crate::shared::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/inventory/orders/{order_id}/transactions",
            get(handlers::get_order_stock_transactions),
        )
        .route(
            "/api/inventory/{product_id}",
            get(handlers::get_inventory).post(handlers::create_inventory),
        )
        .route("/api/inventory/{product_id}/increase", patch(handlers::increase_stock))
        .route("/api/inventory/{product_id}/adjust", put(handlers::adjust_stock))
        .route(
            "/api/inventory/{product_id}/transactions",
            get(handlers::get_stock_transactions),
        )
}

/// 需 `X-Internal-Token`
pub fn internal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/inventory/reserve", post(handlers::reserve_stock))
        .route("/api/inventory/release", post(handlers::release_stock))
        .route("/api/inventory/decrease", post(handlers::decrease_stock))
}
